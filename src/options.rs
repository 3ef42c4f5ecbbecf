use crate::config::{self, Config, Output, Suite};
use crate::sweep::IterationPolicy;
use clap::Parser;
use std::path::PathBuf;

fn parse_size_arg(size: &str) -> Result<usize, String> {
    let bytes = parse_size::parse_size(size).map_err(|err| err.to_string())?;
    usize::try_from(bytes).map_err(|err| err.to_string())
}

#[derive(Parser, Debug, Default)]
#[clap(
    name = "membench",
    author,
    version,
    about = "multi-threaded memory bandwidth and matrix multiplication benchmarks"
)]
pub struct Options {
    #[clap(long = "config", help = "yaml config file, flags take precedence")]
    pub config: Option<PathBuf>,

    #[clap(
        short = 's',
        long = "max-size",
        help = "memory footprint of all workers (e.g. 256MiB)",
        value_parser = parse_size_arg,
    )]
    pub max_size: Option<usize>,

    #[clap(
        short = 'i',
        long = "iterations",
        help = "fixed number of iterations per data point (default: dynamic)"
    )]
    pub iterations: Option<u64>,

    #[clap(
        short = 'n',
        long = "nice",
        help = "process priority",
        allow_hyphen_values = true
    )]
    pub nice: Option<i32>,

    #[clap(
        short = 't',
        long = "threads",
        env = "NUM_THREADS",
        help = "number of worker threads (default: logical cpus)"
    )]
    pub threads: Option<usize>,

    #[clap(short = 'c', long = "memcpy", help = "run the memcpy suite")]
    pub memcpy: bool,

    #[clap(short = 'u', long = "bandwidth", help = "run the bandwidth suite")]
    pub bandwidth: bool,

    #[clap(short = 'm', long = "matrix", help = "run the matrix suite")]
    pub matrix: bool,

    #[clap(short = 'j', long = "job-name", help = "job name (default: machine name)")]
    pub job_name: Option<String>,

    #[clap(short = 'o', long = "output", value_enum, help = "output format")]
    pub output: Option<Output>,

    #[clap(long = "output-dir", help = "directory of the exported results")]
    pub output_dir: Option<PathBuf>,

    #[clap(long = "matrix-min", help = "smallest matrix size")]
    pub matrix_min: Option<usize>,

    #[clap(long = "matrix-max", help = "largest matrix size")]
    pub matrix_max: Option<usize>,

    #[clap(long = "seed", help = "seed for the random access pattern and matrices")]
    pub seed: Option<u64>,
}

impl Options {
    fn suites(&self) -> Vec<Suite> {
        [
            (self.memcpy, Suite::Memcpy),
            (self.bandwidth, Suite::Bandwidth),
            (self.matrix, Suite::Matrix),
        ]
        .into_iter()
        .filter_map(|(selected, suite)| selected.then_some(suite))
        .collect()
    }

    /// Override `config` with every option given on the command line.
    #[must_use]
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(max_size) = self.max_size {
            config.max_size = max_size;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = IterationPolicy::Fixed(iterations);
        }
        if let Some(nice) = self.nice {
            config.nice = nice;
        }
        if let Some(threads) = self.threads {
            config.threads = Some(threads);
        }
        let suites = self.suites();
        if !suites.is_empty() {
            config.suites = suites;
        }
        if let Some(job_name) = &self.job_name {
            config.job_name = Some(job_name.clone());
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(matrix_min) = self.matrix_min {
            config.matrix_min = matrix_min;
        }
        if let Some(matrix_max) = self.matrix_max {
            config.matrix_max = matrix_max;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        config
    }

    /// Resolve the final configuration from the config file and the flags.
    ///
    /// # Errors
    /// If the config file cannot be read or the result is invalid.
    pub fn resolve(&self) -> Result<Config, config::Error> {
        let base = match &self.config {
            Some(path) => Config::from_path(path)?,
            None => Config::default(),
        };
        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::Options;
    use crate::config::{Config, Output, Suite};
    use crate::sweep::IterationPolicy;
    use clap::Parser;
    use color_eyre::eyre;
    use std::io::Write;

    #[test]
    fn test_no_flags_keep_config() -> eyre::Result<()> {
        let options = Options::try_parse_from(["membench"])?;
        let config = Config {
            threads: Some(3),
            ..Config::default()
        };
        // NUM_THREADS may be set in the environment
        let have = Options {
            threads: None,
            ..options
        }
        .apply(config.clone());
        similar_asserts::assert_eq!(have: have, want: config);
        Ok(())
    }

    #[test]
    fn test_flags_override_config() -> eyre::Result<()> {
        let options = Options::try_parse_from([
            "membench", "-s", "1MiB", "-i", "1000", "-n", "-5", "-t", "4", "-u", "-m", "-j",
            "ci", "-o", "csv",
        ])?;
        let config = options.apply(Config::default());
        assert_eq!(config.max_size, 1024 * 1024);
        assert_eq!(config.iterations, IterationPolicy::Fixed(1000));
        assert_eq!(config.nice, -5);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.suites, vec![Suite::Bandwidth, Suite::Matrix]);
        assert_eq!(config.job_name.as_deref(), Some("ci"));
        assert_eq!(config.output, Output::Csv);
        Ok(())
    }

    #[test]
    fn test_invalid_size() {
        assert!(Options::try_parse_from(["membench", "--max-size", "lots"]).is_err());
    }

    #[test]
    fn test_resolve_config_file() -> eyre::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "nice: 0\nsuites: [matrix]\nmatrix-max: 128")?;

        let options = Options {
            config: Some(file.path().to_path_buf()),
            matrix_min: Some(32),
            ..Options::default()
        };
        let config = options.resolve()?;
        assert_eq!(config.nice, 0);
        assert_eq!(config.suites, vec![Suite::Matrix]);
        assert_eq!(config.matrix_min, 32);
        assert_eq!(config.matrix_max, 128);
        Ok(())
    }

    #[test]
    fn test_resolve_rejects_invalid_config() {
        let options = Options {
            matrix_min: Some(2048),
            ..Options::default()
        };
        assert!(matches!(
            options.resolve(),
            Err(crate::config::Error::MatrixRange { .. })
        ));
    }
}
