//! Memory management for tmblock.
//!
//! - [`MemorySegment`]: Trait for the byte region behind a frame plane
//! - [`SegmentAllocator`]: Source of segments for newly allocated frames
//! - [`HeapSegment`] / [`HeapAllocator`]: The default heap-backed implementation
//!
//! # Example
//!
//! ```rust
//! use tmblock::memory::{HeapAllocator, SegmentAllocator};
//!
//! let mut allocator = HeapAllocator::new();
//! let segment = allocator.allocate(4 * 4 * 3).unwrap();
//! assert_eq!(segment.len(), 48);
//! ```

mod heap;
mod segment;

pub use heap::{HeapAllocator, HeapSegment};
pub use segment::{MemorySegment, MemoryType, SegmentAllocator};
