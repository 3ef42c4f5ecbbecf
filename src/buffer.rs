use crate::Error;
use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Alignment of the source and destination buffers of the memory sweeps.
pub const ALIGNMENT: usize = 1024;

/// A zero-initialized heap buffer with a fixed alignment.
pub struct AlignedBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: the buffer exclusively owns its allocation, like a `Box<[u8]>`.
unsafe impl Send for AlignedBuffer {}
unsafe impl Sync for AlignedBuffer {}

impl AlignedBuffer {
    /// Allocate `len` zeroed bytes aligned to `align`.
    ///
    /// # Errors
    /// If the allocator cannot provide the memory or `align` is not a power
    /// of two.
    pub fn zeroed(what: &'static str, len: usize, align: usize) -> Result<Self, Error> {
        let allocation_failed = || Error::Allocation { what, bytes: len };
        // zero sized allocations are not allowed, the returned slice is still empty
        let layout = Layout::from_size_align(len.max(1), align).map_err(|_| allocation_failed())?;
        // SAFETY: layout has a non-zero size
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(allocation_failed)?;
        Ok(Self { ptr, len, layout })
    }

    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl std::ops::Deref for AlignedBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        // SAFETY: ptr is valid for len initialized bytes for the lifetime of self
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl std::ops::DerefMut for AlignedBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: see deref, and &mut self guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        // SAFETY: allocated in `zeroed` with exactly this layout
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("ptr", &self.ptr)
            .field("size", &human_bytes::human_bytes(self.len as f64))
            .field("align", &self.layout.align())
            .finish()
    }
}

/// Allocate a vector of `len` zeros without aborting the process on failure.
pub fn try_zeroed_vec<T>(what: &'static str, len: usize) -> Result<Vec<T>, Error>
where
    T: num_traits::Zero + Clone,
{
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|_| Error::Allocation {
            what,
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
        })?;
    values.resize(len, T::zero());
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::AlignedBuffer;
    use color_eyre::eyre;

    #[test]
    fn test_aligned_buffer() -> eyre::Result<()> {
        let mut buffer = AlignedBuffer::zeroed("test", 4096, super::ALIGNMENT)?;
        assert_eq!(buffer.len(), 4096);
        assert_eq!(buffer.as_ptr() as usize % super::ALIGNMENT, 0);
        assert!(buffer.iter().all(|b| *b == 0));
        buffer[4095] = 0xff;
        assert_eq!(buffer[4095], 0xff);

        let empty = AlignedBuffer::zeroed("empty", 0, 64)?;
        assert!(empty.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_alignment() {
        let err = AlignedBuffer::zeroed("test", 16, 3).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Allocation {
                what: "test",
                bytes: 16
            }
        ));
    }

    #[test]
    fn test_allocation_failure() {
        let err = super::try_zeroed_vec::<f64>("matrix", usize::MAX / 2).unwrap_err();
        assert!(matches!(err, crate::Error::Allocation { what: "matrix", .. }));
    }

    #[test]
    fn test_try_zeroed_vec() -> eyre::Result<()> {
        let values = super::try_zeroed_vec::<f32>("matrix", 16)?;
        assert_eq!(values, vec![0.0; 16]);
        Ok(())
    }
}
