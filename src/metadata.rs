//! Frame metadata types.

use crate::format::{Framerate, Rational};

/// Metadata associated with a frame.
///
/// Timing is expressed in the time base of the stream that produced the
/// frame; the synchronizer rescales it before comparing streams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Presentation timestamp, in stream time base units.
    pub pts: Option<i64>,

    /// Shape of a single pixel.
    pub sample_aspect_ratio: Rational,

    /// Frame rate of the stream this frame belongs to.
    pub framerate: Framerate,

    /// Monotonic sequence number within a stream.
    pub sequence: u64,
}

impl Metadata {
    /// Create new metadata with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create metadata with a presentation timestamp.
    pub fn with_pts(pts: i64) -> Self {
        Self {
            pts: Some(pts),
            ..Default::default()
        }
    }

    /// Set the sequence number.
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Set the sample aspect ratio.
    pub fn sample_aspect_ratio(mut self, sar: Rational) -> Self {
        self.sample_aspect_ratio = sar;
        self
    }

    /// Set the frame rate.
    pub fn framerate(mut self, framerate: Framerate) -> Self {
        self.framerate = framerate;
        self
    }

    /// Copy the properties an output frame inherits from its reference frame.
    ///
    /// Timestamp, aspect ratio and frame rate are taken over; the sequence
    /// number belongs to the receiving stream and is left alone.
    pub fn copy_props_from(&mut self, other: &Metadata) {
        self.pts = other.pts;
        self.sample_aspect_ratio = other.sample_aspect_ratio;
        self.framerate = other.framerate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::with_pts(100)
            .sequence(42)
            .sample_aspect_ratio(Rational::new(16, 15))
            .framerate(Framerate::FPS_30);

        assert_eq!(meta.pts, Some(100));
        assert_eq!(meta.sequence, 42);
        assert_eq!(meta.sample_aspect_ratio, Rational::new(16, 15));
        assert_eq!(meta.framerate, Framerate::FPS_30);
    }

    #[test]
    fn test_copy_props_keeps_sequence() {
        let source = Metadata::with_pts(7)
            .sequence(3)
            .sample_aspect_ratio(Rational::new(4, 3));
        let mut target = Metadata::new().sequence(11);

        target.copy_props_from(&source);

        assert_eq!(target.pts, Some(7));
        assert_eq!(target.sample_aspect_ratio, Rational::new(4, 3));
        assert_eq!(target.sequence, 11);
    }
}
