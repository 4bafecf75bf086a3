//! Output frame allocation.

use crate::error::Result;
use crate::format::PixelFormat;
use crate::frame::Frame;
use crate::memory::{HeapAllocator, SegmentAllocator};
use crate::metadata::Metadata;

/// Default row alignment of allocated output frames, in bytes.
pub const DEFAULT_STRIDE_ALIGN: usize = 32;

/// Allocates output frames shaped like a reference frame.
///
/// The output takes the reference frame's width and height, the negotiated
/// output pixel format, and the reference frame's timestamp, sample aspect
/// ratio and frame rate. Pixel data is not copied; the operation writes it.
pub struct OutputAllocator {
    format: PixelFormat,
    stride_align: usize,
    segments: Box<dyn SegmentAllocator>,
    sequence: u64,
}

impl OutputAllocator {
    /// Create an allocator for `format` backed by the heap.
    pub fn new(format: PixelFormat) -> Self {
        Self::with_segments(format, Box::new(HeapAllocator::new()))
    }

    /// Create an allocator drawing memory from `segments`.
    pub fn with_segments(format: PixelFormat, segments: Box<dyn SegmentAllocator>) -> Self {
        Self {
            format,
            stride_align: DEFAULT_STRIDE_ALIGN,
            segments,
            sequence: 0,
        }
    }

    /// Set the row alignment. Values below 1 are treated as 1.
    pub fn with_stride_align(mut self, align: usize) -> Self {
        self.stride_align = align.max(1);
        self
    }

    /// Output pixel format.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Row stride used for a frame of `width` pixels.
    pub fn stride_for(&self, width: u32) -> usize {
        let row = width as usize * self.format.bytes_per_pixel();
        row.div_ceil(self.stride_align) * self.stride_align
    }

    /// Allocate an output frame for `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`](crate::Error::OutOfMemory) if the
    /// segment allocator cannot provide the memory.
    pub fn allocate(&mut self, reference: &Frame) -> Result<Frame> {
        let (width, height) = (reference.width(), reference.height());
        let stride = self.stride_for(width);
        let size = (stride * height as usize).max(1);
        let segment = self.segments.allocate(size)?;

        let mut metadata = Metadata::new().sequence(self.sequence);
        metadata.copy_props_from(reference.metadata());

        let frame = Frame::new(segment, width, height, stride, self.format, metadata)?;
        self.sequence += 1;

        tracing::trace!(
            width = width,
            height = height,
            stride = stride,
            pts = ?frame.pts(),
            "allocated output frame"
        );
        Ok(frame)
    }
}

impl std::fmt::Debug for OutputAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputAllocator")
            .field("format", &self.format)
            .field("stride_align", &self.stride_align)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::format::{Framerate, Rational};

    fn reference() -> Frame {
        let meta = Metadata::with_pts(1234)
            .sequence(99)
            .sample_aspect_ratio(Rational::new(16, 11))
            .framerate(Framerate::FPS_29_97);
        let mut frame = Frame::alloc(5, 3, PixelFormat::Rgb24, meta).unwrap();
        frame.data_mut().fill(0xaa);
        frame
    }

    #[test]
    fn test_allocate_copies_props_not_pixels() {
        let mut allocator = OutputAllocator::new(PixelFormat::Rgb24);
        let reference = reference();
        let output = allocator.allocate(&reference).unwrap();

        assert_eq!(output.width(), 5);
        assert_eq!(output.height(), 3);
        assert_eq!(output.format(), PixelFormat::Rgb24);
        assert_eq!(output.pts(), Some(1234));
        assert_eq!(output.metadata().sample_aspect_ratio, Rational::new(16, 11));
        assert_eq!(output.metadata().framerate, Framerate::FPS_29_97);
        assert_eq!(output.metadata().sequence, 0);
        assert!(output.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_stride_alignment() {
        let allocator = OutputAllocator::new(PixelFormat::Rgb24);
        assert_eq!(allocator.stride_for(5), 32);
        assert_eq!(allocator.stride_for(11), 64);

        let packed = OutputAllocator::new(PixelFormat::Rgb24).with_stride_align(1);
        assert_eq!(packed.stride_for(5), 15);
    }

    #[test]
    fn test_sequence_increments() {
        let mut allocator = OutputAllocator::new(PixelFormat::Rgb24);
        let reference = reference();
        let first = allocator.allocate(&reference).unwrap();
        let second = allocator.allocate(&reference).unwrap();
        assert_eq!(first.metadata().sequence, 0);
        assert_eq!(second.metadata().sequence, 1);
    }

    #[test]
    fn test_out_of_memory() {
        let segments = HeapAllocator::new().with_max_allocation(16);
        let mut allocator = OutputAllocator::with_segments(PixelFormat::Rgb24, Box::new(segments));

        match allocator.allocate(&reference()) {
            Err(Error::OutOfMemory { requested }) => assert_eq!(requested, 96),
            other => panic!("Expected OutOfMemory, got {:?}", other),
        }
    }
}
