//! Timed memory access primitives.
//!
//! The sweep scheduler treats these as opaque operations: each call performs
//! exactly `iterations` passes of its access pattern over the memory it is
//! given and touches nothing else. Platform specific implementations (e.g.
//! hand written vector loops) can be swapped in through the [`Primitives`]
//! trait; [`Portable`] is the reference implementation.

use std::hint::black_box;

/// A primitive reported a non-zero status.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[error("primitive failed with status {status}")]
pub struct PrimitiveError {
    pub status: i32,
}

pub trait Primitives: Sync {
    /// Copy `src` into `dest`, `iterations` times.
    fn copy(&self, dest: &mut [u8], src: &[u8], iterations: u64) -> Result<(), PrimitiveError>;

    /// Fill `region` with `value`, `iterations` times.
    fn write(&self, region: &mut [u8], iterations: u64, value: u64) -> Result<(), PrimitiveError>;

    /// Read all of `region`, `iterations` times.
    fn read(&self, region: &[u8], iterations: u64) -> Result<(), PrimitiveError>;

    /// Fill every chunk with `value` in the given order, `iterations` times.
    fn random_write(
        &self,
        chunks: &mut [&mut [u8]],
        iterations: u64,
        value: u64,
    ) -> Result<(), PrimitiveError>;

    /// Read every chunk in the given order, `iterations` times.
    fn random_read(&self, chunks: &[&mut [u8]], iterations: u64) -> Result<(), PrimitiveError>;
}

/// Portable primitives operating on 64 bit words.
#[derive(Debug, Default, Clone, Copy)]
pub struct Portable;

#[inline]
fn fill_words(region: &mut [u8], value: u64) {
    let bytes = value.to_ne_bytes();
    for word in region.chunks_exact_mut(8) {
        word.copy_from_slice(&bytes);
    }
}

#[inline]
fn sum_words(region: &[u8]) -> u64 {
    region.chunks_exact(8).fold(0u64, |acc, word| {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(word);
        acc.wrapping_add(u64::from_ne_bytes(bytes))
    })
}

impl Primitives for Portable {
    fn copy(&self, dest: &mut [u8], src: &[u8], iterations: u64) -> Result<(), PrimitiveError> {
        let len = dest.len().min(src.len());
        let (dest, src) = (&mut dest[..len], &src[..len]);
        for _ in 0..iterations {
            dest.copy_from_slice(black_box(src));
            black_box(&mut *dest);
        }
        Ok(())
    }

    fn write(&self, region: &mut [u8], iterations: u64, value: u64) -> Result<(), PrimitiveError> {
        for _ in 0..iterations {
            fill_words(region, black_box(value));
            black_box(&mut *region);
        }
        Ok(())
    }

    fn read(&self, region: &[u8], iterations: u64) -> Result<(), PrimitiveError> {
        for _ in 0..iterations {
            black_box(sum_words(black_box(region)));
        }
        Ok(())
    }

    fn random_write(
        &self,
        chunks: &mut [&mut [u8]],
        iterations: u64,
        value: u64,
    ) -> Result<(), PrimitiveError> {
        for _ in 0..iterations {
            for chunk in chunks.iter_mut() {
                fill_words(chunk, black_box(value));
            }
            black_box(&mut *chunks);
        }
        Ok(())
    }

    fn random_read(&self, chunks: &[&mut [u8]], iterations: u64) -> Result<(), PrimitiveError> {
        for _ in 0..iterations {
            let sum = black_box(chunks)
                .iter()
                .fold(0u64, |acc, chunk| acc.wrapping_add(sum_words(chunk)));
            black_box(sum);
        }
        Ok(())
    }
}
