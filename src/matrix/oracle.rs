use super::{Element, Matrix};
use rayon::prelude::*;

/// Largest absolute element-wise difference of two equally sized matrices.
///
/// A NaN difference counts as infinitely large.
///
/// # Panics
/// If the matrices differ in size.
pub fn max_abs_diff<T: Element>(c1: &Matrix<T>, c2: &Matrix<T>) -> T {
    assert_eq!(c1.n(), c2.n(), "matrix sizes differ");
    let n = c1.n();
    if n == 0 {
        return T::zero();
    }
    c1.as_slice()
        .par_chunks(n)
        .zip(c2.as_slice().par_chunks(n))
        .map(|(row1, row2)| {
            row1.iter()
                .zip(row2)
                .map(|(x, y)| {
                    let diff = (*x - *y).abs();
                    if diff.is_nan() {
                        T::infinity()
                    } else {
                        diff
                    }
                })
                .fold(T::zero(), T::max)
        })
        .reduce(T::zero, T::max)
}

/// Outcome of comparing the tiled result against the scalar one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Check<T> {
    pub max_diff: T,
    pub tolerance: T,
}

impl<T: Element> Check<T> {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.max_diff < self.tolerance
    }
}

/// Compare two `n x n` results against the tolerance for `n` accumulations.
#[must_use]
pub fn check<T: Element>(c1: &Matrix<T>, c2: &Matrix<T>) -> Check<T> {
    Check {
        max_diff: max_abs_diff(c1, c2),
        tolerance: T::tolerance(c1.n()),
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::{Element, Matrix};
    use color_eyre::eyre;

    #[test]
    fn test_identical_matrices() -> eyre::Result<()> {
        let c = Matrix::<f64>::from_fn(8, |j, i| (j * 8 + i) as f64)?;
        assert_eq!(super::max_abs_diff(&c, &c), 0.0);
        assert!(super::check(&c, &c).is_correct());
        Ok(())
    }

    #[test]
    fn test_reports_largest_difference() -> eyre::Result<()> {
        let c1 = Matrix::<f32>::zeros(4)?;
        let mut c2 = Matrix::<f32>::zeros(4)?;
        c2.as_mut_slice()[5] = -0.25;
        c2.as_mut_slice()[13] = 0.5;
        assert_eq!(super::max_abs_diff(&c1, &c2), 0.5);

        let check = super::check(&c1, &c2);
        assert!(!check.is_correct());
        assert_eq!(check.tolerance, f32::TOLERANCE * 4.0);
        Ok(())
    }

    #[test]
    fn test_nan_is_never_correct() -> eyre::Result<()> {
        let c1 = Matrix::<f64>::zeros(2)?;
        let mut c2 = Matrix::<f64>::zeros(2)?;
        c2.as_mut_slice()[3] = f64::NAN;
        assert_eq!(super::max_abs_diff(&c1, &c2), f64::INFINITY);
        assert!(!super::check(&c1, &c2).is_correct());
        Ok(())
    }

    #[test]
    fn test_empty_matrices() -> eyre::Result<()> {
        let c = Matrix::<f64>::zeros(0)?;
        assert_eq!(super::max_abs_diff(&c, &c), 0.0);
        Ok(())
    }
}
