//! Dense square matrix multiplication with a scalar reference kernel, a
//! register tiled kernel and an oracle comparing the two.
//!
//! Matrices are stored as flat `n * n` buffers. Both kernels compute
//! `c[j * n + i] = sum_k a[k * n + i] * b[j * n + k]`.

pub mod oracle;
pub mod scalar;
pub mod tiled;

use crate::{buffer::try_zeroed_vec, Error};
use num_traits::Float;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Floating point element type of the matrix benchmarks.
pub trait Element:
    Float + std::ops::AddAssign + Send + Sync + std::fmt::Debug + std::fmt::Display + 'static
{
    /// One row segment of a tile, `LANES` wide.
    type Lanes: Copy + Default + Send + Sync + AsRef<[Self]> + AsMut<[Self]>;
    /// A `LANES x LANES` output tile.
    type Tile: Copy + Default + AsRef<[Self::Lanes]> + AsMut<[Self::Lanes]>;

    const LANES: usize;
    /// Allowed deviation between the two kernels per multiply-add.
    const TOLERANCE: Self;
    const PRECISION: Precision;

    /// Uniform sample in `[0, 1)`.
    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self;

    /// Allowed deviation after `n` accumulated multiply-adds.
    #[must_use]
    fn tolerance(n: usize) -> Self {
        let n = <Self as num_traits::NumCast>::from(n.max(1)).unwrap_or_else(Self::max_value);
        Self::TOLERANCE * n
    }
}

impl Element for f64 {
    type Lanes = [f64; 2];
    type Tile = [[f64; 2]; 2];

    const LANES: usize = 2;
    const TOLERANCE: Self = 1e-9;
    const PRECISION: Precision = Precision::Double;

    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen()
    }
}

impl Element for f32 {
    type Lanes = [f32; 4];
    type Tile = [[f32; 4]; 4];

    const LANES: usize = 4;
    const TOLERANCE: Self = 1e-5;
    const PRECISION: Precision = Precision::Single;

    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.gen()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precision {
    Double,
    Single,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double => write!(f, "f64"),
            Self::Single => write!(f, "f32"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Kernel {
    Scalar,
    Vector,
}

impl std::fmt::Display for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Vector => write!(f, "vector"),
        }
    }
}

/// Key of a matrix result series, e.g. `f64 scalar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Series {
    pub precision: Precision,
    pub kernel: Kernel,
}

impl Series {
    /// All series in export order.
    pub const ALL: [Series; 4] = [
        Series::new(Precision::Double, Kernel::Scalar),
        Series::new(Precision::Double, Kernel::Vector),
        Series::new(Precision::Single, Kernel::Scalar),
        Series::new(Precision::Single, Kernel::Vector),
    ];

    #[must_use]
    pub const fn new(precision: Precision, kernel: Kernel) -> Self {
        Self { precision, kernel }
    }
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.precision, self.kernel)
    }
}

/// A dense `n x n` matrix.
#[derive(Clone, PartialEq)]
pub struct Matrix<T> {
    n: usize,
    data: Vec<T>,
}

impl<T> std::fmt::Debug for Matrix<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matrix")
            .field("n", &self.n)
            .field("data", &self.data.chunks(self.n.max(1)).collect::<Vec<_>>())
            .finish()
    }
}

impl<T> Matrix<T>
where
    T: Element,
{
    /// # Errors
    /// If the matrix cannot be allocated.
    pub fn zeros(n: usize) -> Result<Self, Error> {
        let len = n.checked_mul(n).ok_or(Error::Allocation {
            what: "matrix",
            bytes: usize::MAX,
        })?;
        let data = try_zeroed_vec("matrix", len)?;
        Ok(Self { n, data })
    }

    /// Matrix with elements drawn uniformly from `[0, 1)`.
    ///
    /// # Errors
    /// If the matrix cannot be allocated.
    pub fn random<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<Self, Error> {
        let mut matrix = Self::zeros(n)?;
        for value in &mut matrix.data {
            *value = T::sample(rng);
        }
        Ok(matrix)
    }

    /// Matrix whose element at buffer position `(outer, inner)`, i.e. at
    /// index `outer * n + inner`, is `f(outer, inner)`.
    ///
    /// # Errors
    /// If the matrix cannot be allocated.
    pub fn from_fn(n: usize, mut f: impl FnMut(usize, usize) -> T) -> Result<Self, Error> {
        let mut matrix = Self::zeros(n)?;
        for (idx, value) in matrix.data.iter_mut().enumerate() {
            *value = f(idx / n, idx % n);
        }
        Ok(matrix)
    }

    pub fn clear(&mut self) {
        self.data.fill(T::zero());
    }
}

impl<T> Matrix<T> {
    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<T> {
        self.data
    }
}

fn assert_same_size<T>(a: &Matrix<T>, b: &Matrix<T>, c: &Matrix<T>) {
    assert!(
        a.n == b.n && b.n == c.n,
        "matrix sizes differ: a={} b={} c={}",
        a.n,
        b.n,
        c.n
    );
}

/// Timings and verification result of one matrix size.
#[derive(Debug, Clone, PartialEq)]
pub struct Run<T> {
    pub n: usize,
    pub scalar: Duration,
    pub vector: Duration,
    pub check: oracle::Check<T>,
}

impl<T> Run<T> {
    /// Floating point operations per second of a kernel that took `elapsed`.
    #[must_use]
    pub fn gflops(&self, elapsed: Duration) -> f64 {
        let n = self.n as f64;
        2.0 * n * n * n / elapsed.as_secs_f64() / 1e9
    }
}

/// Time both kernels on random `n x n` inputs and compare their results.
///
/// The kernels run on `pool`. A failed comparison is reported in the
/// returned [`Run`], it is not an error.
///
/// # Errors
/// If the matrices cannot be allocated or `n` is not a multiple of the tile
/// width of `T`.
pub fn performance<T, R>(pool: &rayon::ThreadPool, n: usize, rng: &mut R) -> Result<Run<T>, Error>
where
    T: Element,
    R: Rng + ?Sized,
{
    tiled::check_alignment::<T>(n)?;
    log::info!("Matrix Size: {n}");

    let a = Matrix::<T>::random(n, rng)?;
    let b = Matrix::<T>::random(n, rng)?;
    let mut scalar_result = Matrix::<T>::zeros(n)?;
    let mut vector_result = Matrix::<T>::zeros(n)?;

    let start = Instant::now();
    pool.install(|| scalar::multiply(&a, &b, &mut scalar_result));
    let scalar = start.elapsed();
    log::info!(
        "{} Matrix {n} Scalar: {:.6} s",
        T::PRECISION,
        scalar.as_secs_f64()
    );

    let start = Instant::now();
    pool.install(|| tiled::multiply(&a, &b, &mut vector_result))?;
    let vector = start.elapsed();
    log::info!(
        "{} Matrix {n} Vector: {:.6} s",
        T::PRECISION,
        vector.as_secs_f64()
    );

    let check = pool.install(|| oracle::check(&scalar_result, &vector_result));
    if check.is_correct() {
        log::info!("{} results are correct.", T::PRECISION);
    } else {
        log::warn!(
            "{}",
            console::style(format!(
                "{} results are incorrect. Maximum difference: {}",
                T::PRECISION,
                check.max_diff
            ))
            .red()
        );
    }
    let run = Run {
        n,
        scalar,
        vector,
        check,
    };
    log::debug!(
        "{} Matrix {n}: scalar {:.3} GFLOP/s, vector {:.3} GFLOP/s",
        T::PRECISION,
        run.gflops(run.scalar),
        run.gflops(run.vector)
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::{Element, Kernel, Matrix, Precision, Series};
    use color_eyre::eyre;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_series_titles() {
        let titles: Vec<String> = Series::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(titles, ["f64 scalar", "f64 vector", "f32 scalar", "f32 vector"]);
        assert_eq!(
            Series::ALL[3],
            Series::new(Precision::Single, Kernel::Vector)
        );
    }

    #[test]
    fn test_tolerance_scales_with_size() {
        approx::assert_relative_eq!(f64::tolerance(1), 1e-9, max_relative = 1e-9);
        approx::assert_relative_eq!(f64::tolerance(0), 1e-9, max_relative = 1e-9);
        approx::assert_relative_eq!(f64::tolerance(1000), 1e-6, max_relative = 1e-9);
        approx::assert_relative_eq!(f32::tolerance(100), 1e-3, max_relative = 1e-5);
        assert!(f64::tolerance(64) < f32::tolerance(64) as f64);
    }

    #[test]
    fn test_random_matrix_in_unit_interval() -> eyre::Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let matrix = Matrix::<f32>::random(16, &mut rng)?;
        assert_eq!(matrix.as_slice().len(), 256);
        assert!(matrix.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
        Ok(())
    }

    #[test]
    fn test_performance_reports_correct_run() -> eyre::Result<()> {
        crate::tests::init_test();
        let pool = crate::thread_pool(2)?;
        let mut rng = StdRng::seed_from_u64(17);

        let run = super::performance::<f64, _>(&pool, 32, &mut rng)?;
        assert_eq!(run.n, 32);
        assert!(run.check.is_correct(), "{:?}", run.check);

        let run = super::performance::<f32, _>(&pool, 32, &mut rng)?;
        assert!(run.check.is_correct(), "{:?}", run.check);
        Ok(())
    }

    #[test]
    fn test_performance_rejects_unaligned_size() -> eyre::Result<()> {
        let pool = crate::thread_pool(1)?;
        let mut rng = StdRng::seed_from_u64(17);
        let err = super::performance::<f32, _>(&pool, 30, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::TileAlignment { n: 30, lanes: 4 }
        ));
        Ok(())
    }
}
