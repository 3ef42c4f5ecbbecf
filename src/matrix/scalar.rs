use super::{assert_same_size, Element, Matrix};
use rayon::prelude::*;

/// Reference triple loop multiply, accumulating into `c`.
///
/// `c` is expected to be zeroed. Every worker owns whole rows of `c`
/// (`c[j * n..(j + 1) * n]`) and sums each element in ascending `k` order,
/// so the result does not depend on the number of workers.
///
/// # Panics
/// If the matrices differ in size.
pub fn multiply<T>(a: &Matrix<T>, b: &Matrix<T>, c: &mut Matrix<T>)
where
    T: Element,
{
    assert_same_size(a, b, c);
    let n = c.n();
    if n == 0 {
        return;
    }
    let (a, b) = (a.as_slice(), b.as_slice());
    c.as_mut_slice()
        .par_chunks_mut(n)
        .enumerate()
        .for_each(|(j, row)| {
            let b_row = &b[j * n..(j + 1) * n];
            for (i, out) in row.iter_mut().enumerate() {
                for (k, b_kj) in b_row.iter().enumerate() {
                    *out += a[k * n + i] * *b_kj;
                }
            }
        });
}
