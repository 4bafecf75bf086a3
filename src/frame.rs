//! Video frame type.

use crate::error::{Error, Result};
use crate::format::PixelFormat;
use crate::memory::{HeapSegment, MemorySegment, MemoryType};
use crate::metadata::Metadata;

/// A single-plane video frame: pixel memory, geometry and metadata.
///
/// Frames are ownership tokens. They are not `Clone`; every hand-off is a
/// move, and dropping the frame releases its memory segment. A frame
/// therefore cannot be released twice, and any path that stops holding a
/// frame has released it.
///
/// # Example
///
/// ```rust
/// use tmblock::format::PixelFormat;
/// use tmblock::frame::Frame;
/// use tmblock::metadata::Metadata;
///
/// let frame = Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0)).unwrap();
/// assert_eq!(frame.stride(), 12);
/// assert_eq!(frame.pts(), Some(0));
/// ```
pub struct Frame {
    segment: Box<dyn MemorySegment>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
    metadata: Metadata,
}

impl Frame {
    /// Create a frame over an existing segment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFrame`] if a row does not fit in `stride`, or
    /// the segment is too small for `height` rows.
    pub fn new(
        segment: Box<dyn MemorySegment>,
        width: u32,
        height: u32,
        stride: usize,
        format: PixelFormat,
        metadata: Metadata,
    ) -> Result<Self> {
        let row_bytes = width as usize * format.bytes_per_pixel();
        if stride < row_bytes {
            return Err(Error::InvalidFrame(format!(
                "stride {} is smaller than a {} row of width {} ({} bytes)",
                stride, format, width, row_bytes
            )));
        }
        let required = required_len(height, stride, row_bytes);
        if segment.len() < required {
            return Err(Error::InvalidFrame(format!(
                "{}x{} {} frame needs {} bytes, segment has {}",
                width,
                height,
                format,
                required,
                segment.len()
            )));
        }

        Ok(Self {
            segment,
            width,
            height,
            stride,
            format,
            metadata,
        })
    }

    /// Allocate a zeroed, tightly packed frame on the heap.
    pub fn alloc(width: u32, height: u32, format: PixelFormat, metadata: Metadata) -> Result<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        let segment = HeapSegment::new((stride * height as usize).max(1))?;
        Self::new(Box::new(segment), width, height, stride, format, metadata)
    }

    /// Wrap tightly packed host pixel data.
    pub fn from_vec(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
        metadata: Metadata,
    ) -> Result<Self> {
        let stride = width as usize * format.bytes_per_pixel();
        Self::new(
            Box::new(HeapSegment::from_vec(data)),
            width,
            height,
            stride,
            format,
            metadata,
        )
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of two consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel format of the plane.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Presentation timestamp, in stream time base units.
    pub fn pts(&self) -> Option<i64> {
        self.metadata.pts
    }

    /// Get a reference to the frame's metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Get a mutable reference to the frame's metadata.
    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// The plane's bytes.
    pub fn data(&self) -> &[u8] {
        self.segment.as_slice()
    }

    /// The plane's bytes, writable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.segment.as_mut_slice()
    }

    /// One row of pixels, without the stride padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {} out of bounds", y);
        let start = y as usize * self.stride;
        &self.data()[start..start + self.row_bytes()]
    }

    /// Bytes of pixel data in one row.
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Get the memory type of the backing segment.
    pub fn memory_type(&self) -> MemoryType {
        self.segment.memory_type()
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("metadata", &self.metadata)
            .field("memory_type", &self.memory_type())
            .finish()
    }
}

/// Minimum plane size: the last row does not need its stride padding.
fn required_len(height: u32, stride: usize, row_bytes: usize) -> usize {
    match height {
        0 => 0,
        h => stride * (h as usize - 1) + row_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_alloc() {
        let frame = Frame::alloc(4, 2, PixelFormat::Rgba, Metadata::with_pts(5)).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.stride(), 16);
        assert_eq!(frame.data().len(), 32);
        assert_eq!(frame.pts(), Some(5));
        assert_eq!(frame.memory_type(), MemoryType::Cpu);
    }

    #[test]
    fn test_frame_stride_too_small() {
        let segment = Box::new(HeapSegment::new(64).unwrap());
        let result = Frame::new(segment, 4, 4, 8, PixelFormat::Rgb24, Metadata::new());
        assert!(matches!(result, Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn test_frame_segment_too_small() {
        let segment = Box::new(HeapSegment::new(40).unwrap());
        let result = Frame::new(segment, 4, 4, 12, PixelFormat::Rgb24, Metadata::new());
        assert!(matches!(result, Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn test_last_row_needs_no_padding() {
        // 3 padded rows of 16 bytes + one unpadded row of 12 bytes
        let segment = Box::new(HeapSegment::new(60).unwrap());
        let frame = Frame::new(segment, 4, 4, 16, PixelFormat::Rgb24, Metadata::new()).unwrap();
        assert_eq!(frame.row(3).len(), 12);
    }

    #[test]
    fn test_from_vec_rows() {
        let data: Vec<u8> = (0..12).collect();
        let frame = Frame::from_vec(data, 2, 2, PixelFormat::Rgb24, Metadata::new()).unwrap();
        assert_eq!(frame.row(1), &[6, 7, 8, 9, 10, 11]);
        assert_eq!(frame.memory_type(), MemoryType::External);
    }

    #[test]
    fn test_data_mut() {
        let mut frame = Frame::alloc(1, 1, PixelFormat::Rgb24, Metadata::new()).unwrap();
        frame.data_mut().copy_from_slice(&[1, 2, 3]);
        assert_eq!(frame.data(), &[1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "row 2 out of bounds")]
    fn test_row_out_of_bounds() {
        let frame = Frame::alloc(2, 2, PixelFormat::Rgb24, Metadata::new()).unwrap();
        let _ = frame.row(2);
    }
}
