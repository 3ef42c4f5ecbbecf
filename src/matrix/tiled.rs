use super::{assert_same_size, Element, Matrix};
use crate::Error;
use rayon::prelude::*;

/// `n` must be a multiple of the tile width of `T`.
///
/// # Errors
/// [`Error::TileAlignment`] otherwise.
pub fn check_alignment<T: Element>(n: usize) -> Result<(), Error> {
    if n % T::LANES == 0 {
        Ok(())
    } else {
        Err(Error::TileAlignment { n, lanes: T::LANES })
    }
}

/// `acc[l] += a[l] * b` for every lane, with a fused multiply-add.
#[inline(always)]
fn fma_broadcast<T: Element>(acc: &mut T::Lanes, a: &T::Lanes, b: T) {
    for (acc, a) in acc.as_mut().iter_mut().zip(a.as_ref()) {
        *acc = a.mul_add(b, *acc);
    }
}

#[inline(always)]
fn load<T: Element>(lanes: &mut T::Lanes, src: &[T]) {
    lanes.as_mut().copy_from_slice(&src[..T::LANES]);
}

/// Register tiled multiply, writing `c`.
///
/// The output is computed in `LANES x LANES` tiles (2x2 for `f64`, 4x4 for
/// `f32`). For a tile at columns `ii..ii + LANES` of rows `jj..jj + LANES`
/// the kernel walks `k` in steps of `LANES`, loads one lane of `a` per `k`
/// and adds it to every output row, scaled by the matching element of `b`.
/// Workers own whole tile rows of `c`, and each tile is stored once when it
/// is complete, overwriting what was there before.
///
/// # Errors
/// [`Error::TileAlignment`] if `n` is not a multiple of `T::LANES`.
///
/// # Panics
/// If the matrices differ in size.
pub fn multiply<T>(a: &Matrix<T>, b: &Matrix<T>, c: &mut Matrix<T>) -> Result<(), Error>
where
    T: Element,
{
    assert_same_size(a, b, c);
    let n = c.n();
    check_alignment::<T>(n)?;
    if n == 0 {
        return Ok(());
    }
    let w = T::LANES;
    let (a, b) = (a.as_slice(), b.as_slice());

    c.as_mut_slice()
        .par_chunks_mut(n * w)
        .enumerate()
        .for_each(|(tile_row, rows)| {
            let jj = tile_row * w;
            for ii in (0..n).step_by(w) {
                let mut acc = T::Tile::default();
                let mut a_lanes = T::Tile::default();
                let mut b_lanes = T::Lanes::default();

                for kk in (0..n).step_by(w) {
                    for (r, lanes) in a_lanes.as_mut().iter_mut().enumerate() {
                        load::<T>(lanes, &a[(kk + r) * n + ii..]);
                    }
                    for (s, acc_row) in acc.as_mut().iter_mut().enumerate() {
                        load::<T>(&mut b_lanes, &b[(jj + s) * n + kk..]);
                        for (a_lane, b_k) in a_lanes.as_ref().iter().zip(b_lanes.as_ref()) {
                            fma_broadcast::<T>(acc_row, a_lane, *b_k);
                        }
                    }
                }

                for (s, acc_row) in acc.as_ref().iter().enumerate() {
                    rows[s * n + ii..s * n + ii + w].copy_from_slice(acc_row.as_ref());
                }
            }
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::matrix::{scalar, Element, Matrix};
    use color_eyre::eyre;
    use rand::{rngs::StdRng, SeedableRng};

    fn compare<T: Element>(n: usize, seed: u64) -> eyre::Result<T> {
        let mut rng = StdRng::seed_from_u64(seed);
        let a = Matrix::<T>::random(n, &mut rng)?;
        let b = Matrix::<T>::random(n, &mut rng)?;
        let mut want = Matrix::<T>::zeros(n)?;
        let mut have = Matrix::<T>::zeros(n)?;
        scalar::multiply(&a, &b, &mut want);
        super::multiply(&a, &b, &mut have)?;
        Ok(crate::matrix::oracle::max_abs_diff(&want, &have))
    }

    #[test]
    fn test_deterministic_pattern_f64() -> eyre::Result<()> {
        let n = 4;
        let a = Matrix::<f64>::from_fn(n, |row, col| (row * n + col) as f64 * 0.5)?;
        let b = Matrix::<f64>::from_fn(n, |row, col| (row as f64) - (col as f64))?;
        let mut want = Matrix::<f64>::zeros(n)?;
        let mut have = Matrix::<f64>::zeros(n)?;
        scalar::multiply(&a, &b, &mut want);
        super::multiply(&a, &b, &mut have)?;

        for (have, want) in have.as_slice().iter().zip(want.as_slice()) {
            assert!((have - want).abs() < 1e-9, "{have} != {want}");
        }
        // c[0 * n + 0] = sum_k a[k * n] * b[k] = 0 * 0 + 2 * -1 + 4 * -2 + 6 * -3
        assert_eq!(have.as_slice()[0], -28.0);
        Ok(())
    }

    #[test]
    fn test_matches_scalar_f64() -> eyre::Result<()> {
        for n in [2, 8, 30, 64] {
            let max_diff = compare::<f64>(n, n as u64)?;
            assert!(max_diff < f64::tolerance(n), "n={n}: {max_diff}");
        }
        Ok(())
    }

    #[test]
    fn test_matches_scalar_f32() -> eyre::Result<()> {
        for n in [4, 8, 36, 128] {
            let max_diff = compare::<f32>(n, n as u64)?;
            assert!(max_diff < f32::tolerance(n), "n={n}: {max_diff}");
        }
        Ok(())
    }

    #[test]
    fn test_repeated_runs_are_identical() -> eyre::Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        let n = 32;
        let a = Matrix::<f32>::random(n, &mut rng)?;
        let b = Matrix::<f32>::random(n, &mut rng)?;
        let mut first = Matrix::<f32>::zeros(n)?;
        let mut second = Matrix::<f32>::zeros(n)?;
        super::multiply(&a, &b, &mut first)?;
        crate::thread_pool(3)?.install(|| super::multiply(&a, &b, &mut second))?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_overwrites_output() -> eyre::Result<()> {
        let n = 2;
        let a = Matrix::<f64>::from_fn(n, |row, col| if row == col { 1.0 } else { 0.0 })?;
        let b = Matrix::<f64>::from_fn(n, |row, col| (row * n + col) as f64)?;
        let mut c = Matrix::<f64>::from_fn(n, |_, _| 100.0)?;
        super::multiply(&a, &b, &mut c)?;
        assert_eq!(c.as_slice(), b.as_slice());
        Ok(())
    }

    #[test]
    fn test_rejects_unaligned_sizes() -> eyre::Result<()> {
        let n = 3;
        let a = Matrix::<f64>::zeros(n)?;
        let b = Matrix::<f64>::zeros(n)?;
        let mut c = Matrix::<f64>::zeros(n)?;
        let err = super::multiply(&a, &b, &mut c).unwrap_err();
        assert!(matches!(err, crate::Error::TileAlignment { n: 3, lanes: 2 }));

        let a = Matrix::<f32>::zeros(6)?;
        let b = Matrix::<f32>::zeros(6)?;
        let mut c = Matrix::<f32>::zeros(6)?;
        let err = super::multiply(&a, &b, &mut c).unwrap_err();
        assert!(matches!(err, crate::Error::TileAlignment { n: 6, lanes: 4 }));
        Ok(())
    }
}
