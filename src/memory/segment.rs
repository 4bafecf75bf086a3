//! Memory segment trait and types.

use crate::error::Result;

/// Type of memory backing a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryType {
    /// Memory allocated by this crate on the heap.
    Cpu,
    /// Memory handed over by the host (decoder output, capture buffer, ...).
    External,
}

/// Trait for memory segment backends.
///
/// A memory segment is the contiguous byte region behind one frame plane.
/// A segment is owned by exactly one frame; dropping the frame drops the
/// segment, which is where the backing memory is released.
pub trait MemorySegment: Send + Sync {
    /// The segment's bytes.
    fn as_slice(&self) -> &[u8];

    /// The segment's bytes, writable.
    fn as_mut_slice(&mut self) -> &mut [u8];

    /// Size of the segment in bytes.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Check if the segment has zero length.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the memory type of this segment.
    fn memory_type(&self) -> MemoryType;
}

/// Source of memory segments for newly allocated frames.
///
/// The output allocator goes through this trait so hosts can plug in a pool,
/// and so allocation failure can be exercised.
pub trait SegmentAllocator: Send {
    /// Allocate a zeroed segment of exactly `size` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`](crate::Error::OutOfMemory) when the
    /// memory cannot be obtained.
    fn allocate(&mut self, size: usize) -> Result<Box<dyn MemorySegment>>;
}
