//! Pixel and stream format types.
//!
//! Only packed 8-bit RGB and RGBA reach the watermark operations, but the
//! other common packed layouts are representable so that a host feeding the
//! wrong kind of frame gets a typed error instead of garbage.

use std::fmt;

// ============================================================================
// Pixel Formats
// ============================================================================

/// Pixel formats (memory layout of a single-plane frame).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[repr(u8)]
pub enum PixelFormat {
    /// RGB 8-bit per channel, packed (24 bits/pixel).
    #[default]
    Rgb24 = 0,
    /// RGBA 8-bit per channel, packed (32 bits/pixel).
    Rgba,
    /// BGR 8-bit per channel, packed (24 bits/pixel).
    Bgr24,
    /// BGRA 8-bit per channel, packed (32 bits/pixel).
    Bgra,
    /// 8-bit grayscale.
    Gray8,
}

impl PixelFormat {
    /// Bytes used by one pixel.
    #[inline]
    pub const fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb24 | PixelFormat::Bgr24 => 3,
            PixelFormat::Rgba | PixelFormat::Bgra => 4,
            PixelFormat::Gray8 => 1,
        }
    }

    /// Whether the format carries an alpha channel.
    #[inline]
    pub const fn has_alpha(&self) -> bool {
        matches!(self, PixelFormat::Rgba | PixelFormat::Bgra)
    }

    /// Short lowercase name, as used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            PixelFormat::Rgb24 => "rgb24",
            PixelFormat::Rgba => "rgba",
            PixelFormat::Bgr24 => "bgr24",
            PixelFormat::Bgra => "bgra",
            PixelFormat::Gray8 => "gray8",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Rationals
// ============================================================================

/// A signed rational number, used for time bases and sample aspect ratios.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    /// Numerator.
    pub num: i32,
    /// Denominator.
    pub den: i32,
}

impl Rational {
    /// Create a new rational.
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// Square pixels (1:1).
    pub const SQUARE: Self = Self::new(1, 1);
    /// Millisecond time base.
    pub const MILLIS: Self = Self::new(1, 1000);
    /// The 90 kHz MPEG time base.
    pub const MPEG: Self = Self::new(1, 90_000);

    /// Whether the rational can be used as a divisor-free scale.
    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    /// Rescale `value` expressed in this unit to nanoseconds.
    ///
    /// Computed in 128-bit to avoid intermediate overflow; the result
    /// saturates at the `i64` range.
    pub fn to_nanos(&self, value: i64) -> i64 {
        if self.den == 0 {
            return 0;
        }
        let nanos = value as i128 * self.num as i128 * 1_000_000_000 / self.den as i128;
        nanos.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::SQUARE
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Video framerate as a rational number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Framerate {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (time units).
    pub den: u32,
}

impl Framerate {
    /// Create a new framerate.
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// 25 fps (PAL).
    pub const FPS_25: Self = Self::new(25, 1);
    /// 30 fps.
    pub const FPS_30: Self = Self::new(30, 1);
    /// 29.97 fps (NTSC).
    pub const FPS_29_97: Self = Self::new(30000, 1001);

    /// Get the framerate as a floating-point value.
    #[inline]
    pub fn fps(&self) -> f64 {
        self.num as f64 / self.den.max(1) as f64
    }

    /// Get frame duration in nanoseconds.
    #[inline]
    pub const fn frame_duration_ns(&self) -> u64 {
        if self.num == 0 {
            return 0;
        }
        (self.den as u64 * 1_000_000_000) / self.num as u64
    }
}

impl Default for Framerate {
    fn default() -> Self {
        Self::FPS_25
    }
}

// ============================================================================
// Stream Format
// ============================================================================

/// Negotiated format of one video stream.
///
/// This is what a source declares before any frame flows, and what the
/// pipeline reports for its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoFormat {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel format (memory layout).
    pub pixel_format: PixelFormat,
    /// Unit of frame timestamps.
    pub time_base: Rational,
    /// Shape of a single pixel.
    pub sample_aspect_ratio: Rational,
    /// Nominal frame rate.
    pub framerate: Framerate,
}

impl Default for VideoFormat {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            pixel_format: PixelFormat::default(),
            time_base: Rational::MILLIS,
            sample_aspect_ratio: Rational::SQUARE,
            framerate: Framerate::default(),
        }
    }
}

impl VideoFormat {
    /// Create a new video format with a millisecond time base.
    pub const fn new(width: u32, height: u32, pixel_format: PixelFormat) -> Self {
        Self {
            width,
            height,
            pixel_format,
            time_base: Rational::MILLIS,
            sample_aspect_ratio: Rational::SQUARE,
            framerate: Framerate::FPS_25,
        }
    }

    /// Set the time base.
    pub const fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = time_base;
        self
    }

    /// Set the sample aspect ratio.
    pub const fn with_sample_aspect_ratio(mut self, sar: Rational) -> Self {
        self.sample_aspect_ratio = sar;
        self
    }

    /// Set the framerate.
    pub const fn with_framerate(mut self, framerate: Framerate) -> Self {
        self.framerate = framerate;
        self
    }

    /// Calculate the tightly packed frame size in bytes for this format.
    pub const fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.bytes_per_pixel()
    }
}
