use crate::{
    partition::Partition,
    primitive::{PrimitiveError, Primitives},
    record::{self, ResultMatrix, SweepPoint},
    shuffle::CHUNK_SIZE,
    Error,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// First block size of the doubling copy sweep.
pub const MIN_BLOCK_SIZE: usize = 256;

/// Bytes moved per worker and data point under [`IterationPolicy::Dynamic`].
pub const DYNAMIC_ITERATION_BYTES: u64 = 1 << 35;

/// Value stored by the write benchmarks.
pub const FILL_VALUE: u64 = 0x1234_5676_89ab_cdef;

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

/// Block sizes of the bandwidth sweeps.
///
/// Dense around typical L1, L2 and L3 capacities.
pub const SIZE_CLASSES: [usize; 59] = [
    256,
    512,
    768,
    KB,
    2 * KB,
    3 * KB,
    4 * KB,
    6 * KB,
    8 * KB,
    12 * KB,
    16 * KB,
    20 * KB,
    24 * KB,
    28 * KB,
    32 * KB,
    34 * KB,
    36 * KB,
    40 * KB,
    48 * KB,
    56 * KB,
    64 * KB,
    72 * KB,
    80 * KB,
    96 * KB,
    112 * KB,
    128 * KB,
    192 * KB,
    256 * KB,
    320 * KB,
    480 * KB,
    512 * KB,
    768 * KB,
    MB,
    1_572_864,
    2 * MB,
    2_621_440,
    3 * MB,
    3_670_016,
    4 * MB,
    5 * MB,
    6 * MB,
    7 * MB,
    8 * MB,
    9 * MB,
    10 * MB,
    11 * MB,
    12 * MB,
    13 * MB,
    14 * MB,
    15 * MB,
    16 * MB,
    20 * MB,
    21 * MB,
    32 * MB,
    64 * MB,
    72 * MB,
    96 * MB,
    128 * MB,
    256 * MB,
];

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::EnumIter,
    Serialize,
    Deserialize,
)]
pub enum BenchmarkKind {
    Copy,
    Write,
    Read,
    RandomWrite,
    RandomRead,
}

impl BenchmarkKind {
    /// Series title used in plots and exported files.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Copy => "memcpy",
            Self::Write => "Write",
            Self::Read => "Read",
            Self::RandomWrite => "Random Write",
            Self::RandomRead => "Random Read",
        }
    }

    #[must_use]
    pub fn size_policy(self) -> SizePolicy {
        match self {
            Self::Copy => SizePolicy::Doubling {
                start: MIN_BLOCK_SIZE,
            },
            Self::Write | Self::Read | Self::RandomWrite | Self::RandomRead => {
                SizePolicy::Table(&SIZE_CLASSES)
            }
        }
    }
}

impl std::fmt::Display for BenchmarkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// How many times a primitive repeats its access pattern per data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IterationPolicy {
    /// Keep `size * iterations` close to [`DYNAMIC_ITERATION_BYTES`].
    Dynamic,
    Fixed(u64),
}

impl Default for IterationPolicy {
    fn default() -> Self {
        Self::Dynamic
    }
}

impl std::fmt::Display for IterationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dynamic => write!(f, "dynamic"),
            Self::Fixed(iterations) => write!(f, "{iterations}"),
        }
    }
}

impl IterationPolicy {
    /// Iterations for a block of `size` bytes, at least one.
    #[must_use]
    pub fn iterations(self, size: usize) -> u64 {
        match self {
            Self::Dynamic => (DYNAMIC_ITERATION_BYTES / (size.max(1) as u64)).max(1),
            Self::Fixed(iterations) => iterations.max(1),
        }
    }
}

/// How the block size advances from one data point to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizePolicy {
    /// Start at `start` and double every step, without an upper index bound.
    Doubling { start: usize },
    /// Walk a fixed table of sizes until it is exhausted.
    Table(&'static [usize]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SweepState {
    NotStarted,
    Running { index: usize, size: usize },
    Done,
}

/// Sizes visited by one sweep.
///
/// Yields `(index, size)` while `size * workers <= max_size`.
#[derive(Debug, Clone)]
pub struct Schedule {
    policy: SizePolicy,
    max_size: usize,
    workers: usize,
    state: SweepState,
}

impl Schedule {
    #[must_use]
    pub fn new(policy: SizePolicy, max_size: usize, workers: usize) -> Self {
        Self {
            policy,
            max_size,
            workers,
            state: SweepState::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> SweepState {
        self.state
    }

    fn candidate(&self) -> Option<(usize, usize)> {
        match (self.state, self.policy) {
            (SweepState::Done, _) => None,
            (SweepState::NotStarted, SizePolicy::Doubling { start }) => Some((0, start)),
            (SweepState::NotStarted, SizePolicy::Table(sizes)) => {
                sizes.first().map(|size| (0, *size))
            }
            (SweepState::Running { index, size }, SizePolicy::Doubling { .. }) => {
                size.checked_mul(2).map(|size| (index + 1, size))
            }
            (SweepState::Running { index, .. }, SizePolicy::Table(sizes)) => {
                sizes.get(index + 1).map(|size| (index + 1, *size))
            }
        }
    }
}

impl Iterator for Schedule {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let fits = |size: usize| {
            size.checked_mul(self.workers)
                .is_some_and(|total| total <= self.max_size)
        };
        match self.candidate() {
            Some((index, size)) if fits(size) => {
                self.state = SweepState::Running { index, size };
                Some((index, size))
            }
            _ => {
                self.state = SweepState::Done;
                None
            }
        }
    }
}

/// Runs timed memory sweeps on a fixed pool of workers.
///
/// Every data point is a fork/join batch: the region is split into one static
/// span per worker, all workers run the primitive concurrently and the
/// measured time is the makespan of the batch.
#[derive(Debug)]
pub struct Sweeper<'a, P> {
    pool: &'a rayon::ThreadPool,
    primitives: &'a P,
    workers: usize,
    max_size: usize,
    iterations: IterationPolicy,
}

impl<'a, P> Sweeper<'a, P>
where
    P: Primitives,
{
    /// Buffers handed to the sweeps must hold at least `max_size` bytes.
    ///
    /// # Panics
    /// If `workers` is zero.
    #[must_use]
    pub fn new(
        pool: &'a rayon::ThreadPool,
        primitives: &'a P,
        workers: usize,
        max_size: usize,
        iterations: IterationPolicy,
    ) -> Self {
        assert!(workers > 0, "sweeps need at least one worker");
        Self {
            pool,
            primitives,
            workers,
            max_size,
            iterations,
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn schedule(&self, kind: BenchmarkKind) -> Schedule {
        Schedule::new(kind.size_policy(), self.max_size, self.workers)
    }

    fn sweep<F>(
        &self,
        kind: BenchmarkKind,
        results: &mut ResultMatrix<BenchmarkKind>,
        mut batch: F,
    ) -> Result<Vec<SweepPoint>, Error>
    where
        F: FnMut(usize, u64) -> Result<(), PrimitiveError>,
    {
        log::info!("Test {kind}");
        let mut points = Vec::new();
        for (index, size) in self.schedule(kind) {
            let iterations = self.iterations.iterations(size);
            let start = Instant::now();
            batch(size, iterations).map_err(|err| Error::Primitive {
                kind,
                size,
                status: err.status,
            })?;
            let elapsed: Duration = start.elapsed();
            points.push(record::record(
                results,
                kind,
                index,
                size * self.workers,
                iterations,
                elapsed,
            ));
        }
        Ok(points)
    }

    fn check_len(&self, what: &'static str, len: usize, required: usize) {
        assert!(
            len >= required,
            "{what} holds {len} units but the sweep needs {required}"
        );
    }

    /// Sequential copy from `src` to `dest` with doubling block sizes.
    ///
    /// # Panics
    /// If a buffer is smaller than the configured maximum size.
    pub fn copy(
        &self,
        dest: &mut [u8],
        src: &[u8],
        results: &mut ResultMatrix<BenchmarkKind>,
    ) -> Result<Vec<SweepPoint>, Error> {
        self.check_len("destination", dest.len(), self.max_size);
        self.check_len("source", src.len(), self.max_size);
        let partition = Partition::new(self.max_size, self.workers);
        let mut dests = partition.split_mut(dest);
        let srcs = partition.split(src);

        self.sweep(BenchmarkKind::Copy, results, |size, iterations| {
            self.pool.install(|| {
                dests
                    .par_iter_mut()
                    .zip(srcs.par_iter())
                    .try_for_each(|(dest, src)| {
                        self.primitives
                            .copy(&mut dest[..size], &src[..size], iterations)
                    })
            })
        })
    }

    /// Sequential writes over the size table.
    ///
    /// # Panics
    /// If `buffer` is smaller than the configured maximum size.
    pub fn write(
        &self,
        buffer: &mut [u8],
        results: &mut ResultMatrix<BenchmarkKind>,
    ) -> Result<Vec<SweepPoint>, Error> {
        self.check_len("buffer", buffer.len(), self.max_size);
        let partition = Partition::new(self.max_size, self.workers);
        let mut regions = partition.split_mut(buffer);

        self.sweep(BenchmarkKind::Write, results, |size, iterations| {
            self.pool.install(|| {
                regions.par_iter_mut().try_for_each(|region| {
                    self.primitives
                        .write(&mut region[..size], iterations, FILL_VALUE)
                })
            })
        })
    }

    /// Sequential reads over the size table.
    ///
    /// # Panics
    /// If `buffer` is smaller than the configured maximum size.
    pub fn read(
        &self,
        buffer: &[u8],
        results: &mut ResultMatrix<BenchmarkKind>,
    ) -> Result<Vec<SweepPoint>, Error> {
        self.check_len("buffer", buffer.len(), self.max_size);
        let partition = Partition::new(self.max_size, self.workers);
        let regions = partition.split(buffer);

        self.sweep(BenchmarkKind::Read, results, |size, iterations| {
            self.pool.install(|| {
                regions
                    .par_iter()
                    .try_for_each(|region| self.primitives.read(&region[..size], iterations))
            })
        })
    }

    /// Writes to shuffled chunks over the size table.
    ///
    /// Each worker owns a contiguous slice of the chunk permutation and
    /// visits `size / CHUNK_SIZE` chunks of it per iteration.
    ///
    /// # Panics
    /// If there are fewer than `max_size / CHUNK_SIZE` chunks.
    pub fn random_write(
        &self,
        chunks: &mut [&mut [u8]],
        results: &mut ResultMatrix<BenchmarkKind>,
    ) -> Result<Vec<SweepPoint>, Error> {
        let num_chunks = self.max_size / CHUNK_SIZE;
        self.check_len("chunk permutation", chunks.len(), num_chunks);
        let partition = Partition::new(num_chunks, self.workers);
        let mut parts = partition.split_mut(chunks);

        self.sweep(BenchmarkKind::RandomWrite, results, |size, iterations| {
            let count = size / CHUNK_SIZE;
            self.pool.install(|| {
                parts.par_iter_mut().try_for_each(|part| {
                    self.primitives
                        .random_write(&mut part[..count], iterations, FILL_VALUE)
                })
            })
        })
    }

    /// Reads from shuffled chunks over the size table.
    ///
    /// # Panics
    /// If there are fewer than `max_size / CHUNK_SIZE` chunks.
    pub fn random_read(
        &self,
        chunks: &[&mut [u8]],
        results: &mut ResultMatrix<BenchmarkKind>,
    ) -> Result<Vec<SweepPoint>, Error> {
        let num_chunks = self.max_size / CHUNK_SIZE;
        self.check_len("chunk permutation", chunks.len(), num_chunks);
        let partition = Partition::new(num_chunks, self.workers);
        let parts = partition.split(chunks);

        self.sweep(BenchmarkKind::RandomRead, results, |size, iterations| {
            let count = size / CHUNK_SIZE;
            self.pool.install(|| {
                parts.par_iter().try_for_each(|part| {
                    self.primitives.random_read(&part[..count], iterations)
                })
            })
        })
    }
}
