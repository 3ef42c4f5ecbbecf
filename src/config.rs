use crate::matrix::Element;
use crate::sweep::IterationPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] serde_yaml::Error),

    #[error("at least one worker thread is required")]
    NoThreads,

    #[error("invalid matrix size range {min}..={max}")]
    MatrixRange { min: usize, max: usize },

    #[error("minimum matrix size {n} is not a multiple of {lanes}")]
    MatrixAlignment { n: usize, lanes: usize },
}

/// A benchmark suite.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    /// Sequential copy with doubling block sizes.
    Memcpy,
    /// Sequential and random reads and writes over the size table.
    Bandwidth,
    /// Scalar and tiled matrix multiplication.
    Matrix,
}

impl Suite {
    /// Base name of the exported file.
    #[must_use]
    pub fn output_name(self) -> &'static str {
        match self {
            Self::Memcpy => "memcpy",
            Self::Bandwidth => "bandwidth",
            Self::Matrix => "matrix",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Memcpy => "Memcpy",
            Self::Bandwidth => "Bandwidth",
            Self::Matrix => "Matrix",
        }
    }
}

impl std::fmt::Display for Suite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.output_name())
    }
}

/// Format of the exported results.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    /// SVG line plot.
    #[default]
    Plot,
    /// Plain CSV file.
    Csv,
}

impl Output {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Plot => "svg",
            Self::Csv => "csv",
        }
    }
}

/// Resolved configuration of a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Memory footprint of all workers together, in bytes.
    pub max_size: usize,
    /// `dynamic`, or `fixed: <n>`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub iterations: IterationPolicy,
    pub nice: i32,
    /// Number of worker threads. Defaults to the number of logical CPUs.
    pub threads: Option<usize>,
    pub suites: Vec<Suite>,
    /// Replaces the machine name in job titles.
    pub job_name: Option<String>,
    pub output: Output,
    pub output_dir: PathBuf,
    pub matrix_min: usize,
    pub matrix_max: usize,
    /// Seed for the chunk permutation and random matrices.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_size: 256 * 1024 * 1024,
            iterations: IterationPolicy::Dynamic,
            nice: -20,
            threads: None,
            suites: vec![Suite::Memcpy],
            job_name: None,
            output: Output::Plot,
            output_dir: PathBuf::from("."),
            matrix_min: 64,
            matrix_max: 1024,
            seed: None,
        }
    }
}

impl Config {
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self, Error> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.threads == Some(0) {
            return Err(Error::NoThreads);
        }
        if self.matrix_min == 0 || self.matrix_min > self.matrix_max {
            return Err(Error::MatrixRange {
                min: self.matrix_min,
                max: self.matrix_max,
            });
        }
        let lanes = <f32 as Element>::LANES.max(<f64 as Element>::LANES);
        if self.matrix_min % lanes != 0 {
            return Err(Error::MatrixAlignment {
                n: self.matrix_min,
                lanes,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Matrix sizes from `matrix_min` doubling up to `matrix_max`.
    pub fn matrix_sizes(&self) -> impl Iterator<Item = usize> {
        let max = self.matrix_max;
        std::iter::successors(Some(self.matrix_min).filter(|n| *n > 0), |n| {
            n.checked_mul(2)
        })
        .take_while(move |n| *n <= max)
    }

    /// Title of a suite's results, e.g. `x86_64 8Thread Bandwidth`.
    #[must_use]
    pub fn job_title(&self, machine: &str, suite: Suite) -> String {
        format!(
            "{} {}Thread {}",
            self.job_name.as_deref().unwrap_or(machine),
            self.num_threads(),
            suite.title()
        )
    }

    /// Path of a suite's exported results.
    #[must_use]
    pub fn output_path(&self, suite: Suite) -> PathBuf {
        self.output_dir
            .join(suite.output_name())
            .with_extension(self.output.extension())
    }
}
