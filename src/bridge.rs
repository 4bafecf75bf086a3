//! Picture descriptors handed to watermark operations.
//!
//! A picture is a narrow, borrowed view of a [`Frame`]: geometry, stride,
//! layout tag and the plane bytes. It aliases the frame's memory and cannot
//! outlive it. Descriptors are built fresh for every operation call.

use crate::error::{Error, Result};
use crate::format::PixelFormat;
use crate::frame::Frame;

/// Channel layout tag understood by the watermark operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PictureLayout {
    /// Packed 8-bit R, G, B.
    Rgb,
    /// Packed 8-bit R, G, B, A.
    Rgba,
}

impl PictureLayout {
    /// The frame pixel format this layout corresponds to.
    pub const fn pixel_format(&self) -> PixelFormat {
        match self {
            PictureLayout::Rgb => PixelFormat::Rgb24,
            PictureLayout::Rgba => PixelFormat::Rgba,
        }
    }

    /// Bytes used by one pixel.
    pub const fn channels(&self) -> usize {
        match self {
            PictureLayout::Rgb => 3,
            PictureLayout::Rgba => 4,
        }
    }
}

impl TryFrom<PixelFormat> for PictureLayout {
    type Error = Error;

    fn try_from(format: PixelFormat) -> Result<Self> {
        match format {
            PixelFormat::Rgb24 => Ok(PictureLayout::Rgb),
            PixelFormat::Rgba => Ok(PictureLayout::Rgba),
            other => Err(Error::UnsupportedLayout(other)),
        }
    }
}

/// Read-only picture descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Picture<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between row starts.
    pub stride: usize,
    /// Channel layout.
    pub layout: PictureLayout,
    /// Plane bytes, starting at the first pixel of the first row.
    pub data: &'a [u8],
}

/// Writable picture descriptor for the output frame.
#[derive(Debug)]
pub struct PictureMut<'a> {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes between row starts.
    pub stride: usize,
    /// Channel layout.
    pub layout: PictureLayout,
    /// Plane bytes, starting at the first pixel of the first row.
    pub data: &'a mut [u8],
}

impl Picture<'_> {
    /// One row of pixels, without stride padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {} out of bounds", y);
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.layout.channels()]
    }
}

impl PictureMut<'_> {
    /// One row of pixels, writable.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        assert!(y < self.height, "row {} out of bounds", y);
        let start = y as usize * self.stride;
        let len = self.width as usize * self.layout.channels();
        &mut self.data[start..start + len]
    }

    /// Reborrow as a read-only picture.
    pub fn as_picture(&self) -> Picture<'_> {
        Picture {
            width: self.width,
            height: self.height,
            stride: self.stride,
            layout: self.layout,
            data: &*self.data,
        }
    }
}

/// Describe a frame for reading.
///
/// # Errors
///
/// Returns [`Error::UnsupportedLayout`] for anything but RGB24 or RGBA.
pub fn picture(frame: &Frame) -> Result<Picture<'_>> {
    let layout = PictureLayout::try_from(frame.format())?;
    Ok(Picture {
        width: frame.width(),
        height: frame.height(),
        stride: frame.stride(),
        layout,
        data: frame.data(),
    })
}

/// Describe a frame for writing.
///
/// # Errors
///
/// Returns [`Error::UnsupportedLayout`] for anything but RGB24 or RGBA.
pub fn picture_mut(frame: &mut Frame) -> Result<PictureMut<'_>> {
    let layout = PictureLayout::try_from(frame.format())?;
    let (width, height, stride) = (frame.width(), frame.height(), frame.stride());
    Ok(PictureMut {
        width,
        height,
        stride,
        layout,
        data: frame.data_mut(),
    })
}
