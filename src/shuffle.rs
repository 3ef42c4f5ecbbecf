use rand::Rng;

/// Size of the chunks visited by the random access benchmarks.
pub const CHUNK_SIZE: usize = 256;

/// Shuffle `items` in place (Fisher-Yates).
///
/// Walks the slice from the back and swaps every slot with a uniformly chosen
/// slot at or before it. Reproducibility is up to the caller's choice of `rng`.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Split `buffer` into chunks of [`CHUNK_SIZE`] bytes and put them into a
/// random order.
///
/// Trailing bytes that do not fill a whole chunk are left out. Every chunk of
/// the buffer appears exactly once in the result.
pub fn chunk_permutation<'a, R>(buffer: &'a mut [u8], rng: &mut R) -> Vec<&'a mut [u8]>
where
    R: Rng + ?Sized,
{
    let mut chunks: Vec<&'a mut [u8]> = buffer.chunks_exact_mut(CHUNK_SIZE).collect();
    shuffle(&mut chunks, rng);
    chunks
}
