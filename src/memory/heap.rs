//! Heap-backed memory segment.

use super::{MemorySegment, MemoryType, SegmentAllocator};
use crate::error::{Error, Result};

/// A memory segment backed by heap allocation.
///
/// # Example
///
/// ```rust
/// use tmblock::memory::{HeapSegment, MemorySegment};
///
/// let segment = HeapSegment::new(1024).unwrap();
/// assert_eq!(segment.len(), 1024);
/// ```
pub struct HeapSegment {
    /// Boxed so the allocation is never resized after creation.
    data: Box<[u8]>,
    memory_type: MemoryType,
}

impl HeapSegment {
    /// Create a new zero-initialized heap segment with the given size.
    ///
    /// The allocation is fallible: exhaustion is reported as
    /// [`Error::OutOfMemory`] instead of aborting the process.
    ///
    /// # Errors
    ///
    /// Returns an error if size is 0 or allocation fails.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidFrame("segment size must be greater than 0".into()));
        }

        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|_| Error::OutOfMemory { requested: size })?;
        data.resize(size, 0u8);

        Ok(Self {
            data: data.into_boxed_slice(),
            memory_type: MemoryType::Cpu,
        })
    }

    /// Wrap bytes produced by the host.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
            memory_type: MemoryType::External,
        }
    }
}

impl MemorySegment for HeapSegment {
    fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn memory_type(&self) -> MemoryType {
        self.memory_type
    }
}

/// Allocates plain [`HeapSegment`]s.
///
/// An optional byte limit caps any single allocation, which is how a host
/// bounds the size of frames it is willing to produce.
#[derive(Debug, Clone, Default)]
pub struct HeapAllocator {
    max_allocation: Option<usize>,
}

impl HeapAllocator {
    /// Create an unlimited heap allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any single allocation larger than `bytes`.
    pub fn with_max_allocation(mut self, bytes: usize) -> Self {
        self.max_allocation = Some(bytes);
        self
    }
}

impl SegmentAllocator for HeapAllocator {
    fn allocate(&mut self, size: usize) -> Result<Box<dyn MemorySegment>> {
        if self.max_allocation.is_some_and(|max| size > max) {
            return Err(Error::OutOfMemory { requested: size });
        }
        Ok(Box::new(HeapSegment::new(size)?))
    }
}
