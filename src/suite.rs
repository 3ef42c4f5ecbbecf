//! Benchmark suites driving the sweeps and matrix runs of one configuration.

use crate::{
    buffer::{AlignedBuffer, ALIGNMENT},
    config::{Config, Suite},
    matrix::{self, Kernel, Precision, Series},
    primitive::Primitives,
    record::{ResultMatrix, SweepPoint},
    shuffle,
    sweep::{BenchmarkKind, Sweeper},
    Error,
};
use rand::{rngs::StdRng, SeedableRng};

/// Source and destination buffers of the memory sweeps.
#[derive(Debug)]
pub struct Buffers {
    pub src: AlignedBuffer,
    pub dest: AlignedBuffer,
}

impl Buffers {
    /// Allocate two zeroed buffers of `size` bytes.
    pub fn allocate(size: usize) -> Result<Self, Error> {
        let src = AlignedBuffer::zeroed("source buffer", size, ALIGNMENT)?;
        let dest = AlignedBuffer::zeroed("destination buffer", size, ALIGNMENT)?;
        log::info!("src = {:p}, dest = {:p}", src.as_ptr(), dest.as_ptr());
        Ok(Self { src, dest })
    }
}

/// Results of the memory sweeps of one suite.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    /// Throughput per benchmark kind, aligned with the shared size labels.
    pub results: ResultMatrix<BenchmarkKind>,
    /// Every measured point, in sweep order.
    pub points: Vec<(BenchmarkKind, Vec<SweepPoint>)>,
}

impl SweepReport {
    fn new(kinds: impl IntoIterator<Item = BenchmarkKind>) -> Self {
        Self {
            results: ResultMatrix::new(kinds),
            points: Vec::new(),
        }
    }
}

fn sweeper<'a, P>(
    pool: &'a rayon::ThreadPool,
    primitives: &'a P,
    config: &Config,
) -> Sweeper<'a, P>
where
    P: Primitives,
{
    Sweeper::new(
        pool,
        primitives,
        pool.current_num_threads(),
        config.max_size,
        config.iterations,
    )
}

/// Runs benchmark suites on a fixed worker pool.
#[derive(Debug)]
pub struct Bench<P> {
    config: Config,
    pool: rayon::ThreadPool,
    primitives: P,
    machine: String,
    rng: StdRng,
}

impl<P> Bench<P>
where
    P: Primitives,
{
    /// # Errors
    /// If the configuration is invalid or the worker pool cannot be built.
    pub fn new(config: Config, primitives: P, machine: impl Into<String>) -> Result<Self, Error> {
        config.validate()?;
        let pool = crate::thread_pool(config.num_threads())?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            pool,
            primitives,
            machine: machine.into(),
            rng,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    #[must_use]
    pub fn job_title(&self, suite: Suite) -> String {
        self.config.job_title(&self.machine, suite)
    }

    /// Sequential copy from the source into the destination buffer.
    pub fn memcpy(&self, buffers: &mut Buffers) -> Result<SweepReport, Error> {
        let mut report = SweepReport::new([BenchmarkKind::Copy]);
        let points = sweeper(&self.pool, &self.primitives, &self.config).copy(
            &mut buffers.dest,
            &buffers.src,
            &mut report.results,
        )?;
        report.points.push((BenchmarkKind::Copy, points));
        Ok(report)
    }

    /// Sequential and random writes and reads on the source buffer.
    ///
    /// The chunk permutation is built once, after the sequential sweeps, and
    /// shared by both random sweeps.
    pub fn bandwidth(&mut self, buffers: &mut Buffers) -> Result<SweepReport, Error> {
        let mut report = SweepReport::new([
            BenchmarkKind::Write,
            BenchmarkKind::Read,
            BenchmarkKind::RandomWrite,
            BenchmarkKind::RandomRead,
        ]);
        let results = &mut report.results;
        let sweeper = sweeper(&self.pool, &self.primitives, &self.config);
        let write = sweeper.write(&mut buffers.src, results)?;
        let read = sweeper.read(&buffers.src, results)?;

        let region = &mut buffers.src[..self.config.max_size];
        let mut chunks = shuffle::chunk_permutation(region, &mut self.rng);
        log::debug!("shuffled {} chunks", chunks.len());
        let random_write = sweeper.random_write(&mut chunks, results)?;
        let random_read = sweeper.random_read(&chunks, results)?;

        report.points = vec![
            (BenchmarkKind::Write, write),
            (BenchmarkKind::Read, read),
            (BenchmarkKind::RandomWrite, random_write),
            (BenchmarkKind::RandomRead, random_read),
        ];
        Ok(report)
    }

    /// Scalar and tiled multiplication for every configured matrix size.
    ///
    /// Each series holds the elapsed seconds per size. Incorrect tiled
    /// results are logged but do not fail the suite.
    pub fn matrix(&mut self) -> Result<ResultMatrix<Series>, Error> {
        let mut results = ResultMatrix::new(Series::ALL);
        let sizes: Vec<usize> = self.config.matrix_sizes().collect();
        for (index, n) in sizes.into_iter().enumerate() {
            let double = matrix::performance::<f64, _>(&self.pool, n, &mut self.rng)?;
            let single = matrix::performance::<f32, _>(&self.pool, n, &mut self.rng)?;

            let label = n.to_string();
            for (series, elapsed) in [
                (Series::new(Precision::Double, Kernel::Scalar), double.scalar),
                (Series::new(Precision::Double, Kernel::Vector), double.vector),
                (Series::new(Precision::Single, Kernel::Scalar), single.scalar),
                (Series::new(Precision::Single, Kernel::Vector), single.vector),
            ] {
                results.set(series, index, elapsed.as_secs_f64(), label.clone());
            }
        }
        Ok(results)
    }
}
