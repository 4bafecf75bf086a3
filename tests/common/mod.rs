//! Shared helpers for integration tests.
//!
//! [`Tracker`] hands out frames whose memory reports back when it is dropped,
//! so tests can assert that every frame was released exactly once.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tmblock::error::{Error, Result};
use tmblock::format::PixelFormat;
use tmblock::frame::Frame;
use tmblock::memory::{MemorySegment, MemoryType, SegmentAllocator};
use tmblock::metadata::Metadata;

/// Segment that counts its own release.
struct CountingSegment {
    data: Vec<u8>,
    released: Arc<AtomicUsize>,
}

impl MemorySegment for CountingSegment {
    fn as_slice(&self) -> &[u8] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn memory_type(&self) -> MemoryType {
        MemoryType::External
    }
}

impl Drop for CountingSegment {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts allocated and released frame memory.
#[derive(Clone, Default)]
pub struct Tracker {
    allocated: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn segment(&self, size: usize) -> Box<dyn MemorySegment> {
        self.allocated.fetch_add(1, Ordering::SeqCst);
        Box::new(CountingSegment {
            data: vec![0; size.max(1)],
            released: Arc::clone(&self.released),
        })
    }

    /// A tightly packed tracked frame.
    pub fn frame(&self, width: u32, height: u32, format: PixelFormat, pts: i64) -> Frame {
        let stride = width as usize * format.bytes_per_pixel();
        let segment = self.segment(stride * height as usize);
        Frame::new(segment, width, height, stride, format, Metadata::with_pts(pts)).unwrap()
    }

    pub fn input(&self, pts: i64) -> Frame {
        self.frame(4, 4, PixelFormat::Rgb24, pts)
    }

    pub fn logo(&self, pts: i64) -> Frame {
        self.frame(2, 2, PixelFormat::Rgba, pts)
    }

    /// Segment allocator for pipeline outputs, tracked like every other frame.
    pub fn allocator(&self) -> Box<dyn SegmentAllocator> {
        Box::new(TrackedAllocator {
            tracker: self.clone(),
            fail_first: 0,
        })
    }

    /// Like [`Tracker::allocator`], but the first `n` requests fail.
    pub fn failing_allocator(&self, n: usize) -> Box<dyn SegmentAllocator> {
        Box::new(TrackedAllocator {
            tracker: self.clone(),
            fail_first: n,
        })
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Frames allocated but not yet released.
    pub fn live(&self) -> usize {
        self.allocated() - self.released()
    }
}

struct TrackedAllocator {
    tracker: Tracker,
    fail_first: usize,
}

impl SegmentAllocator for TrackedAllocator {
    fn allocate(&mut self, size: usize) -> Result<Box<dyn MemorySegment>> {
        if self.fail_first > 0 {
            self.fail_first -= 1;
            return Err(Error::OutOfMemory { requested: size });
        }
        Ok(self.tracker.segment(size))
    }
}
