#![allow(
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::too_many_lines,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap
)]

pub mod buffer;
pub mod config;
pub mod export;
pub mod format;
pub mod matrix;
pub mod options;
pub mod partition;
pub mod primitive;
pub mod record;
pub mod shuffle;
pub mod suite;
pub mod sweep;

pub use config::Config;
pub use sweep::BenchmarkKind;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to allocate {} for the {what}", human_bytes::human_bytes(*bytes as f64))]
    Allocation { what: &'static str, bytes: usize },

    #[error("{kind} primitive failed with status {status} at block size {size}")]
    Primitive {
        kind: BenchmarkKind,
        size: usize,
        status: i32,
    },

    #[error("matrix size {n} is not a multiple of the tile width {lanes}")]
    TileAlignment { n: usize, lanes: usize },

    #[error("failed to build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Export(#[from] export::Error),

    #[error("invalid configuration")]
    Config(#[from] config::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn thread_pool(num_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|idx| format!("membench-worker-{idx}"))
        .build()
}

#[cfg(test)]
pub mod tests {
    static INIT: std::sync::Once = std::sync::Once::new();

    pub fn init_test() {
        INIT.call_once(|| {
            env_logger::builder().is_test(true).init();
        });
    }
}
