//! Dual-stream frame synchronizer.
//!
//! Keeps one pending queue per stream and pairs their heads by timestamp.
//! Each [`SyncEvent::Pair`] consumes exactly one frame from each queue;
//! frames that fall behind the alignment point are released on the spot.
//!
//! # Example
//!
//! ```rust
//! use tmblock::format::PixelFormat;
//! use tmblock::frame::Frame;
//! use tmblock::metadata::Metadata;
//! use tmblock::sync::{FrameSync, SyncConfig, SyncEvent};
//!
//! let mut sync = FrameSync::new(SyncConfig::default());
//! sync.push_input(Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0)).unwrap()).unwrap();
//! sync.push_logo(Frame::alloc(2, 2, PixelFormat::Rgba, Metadata::with_pts(0)).unwrap()).unwrap();
//!
//! assert!(matches!(sync.next_event(), SyncEvent::Pair(_)));
//! ```

use crate::error::{Error, Result};
use crate::format::Rational;
use crate::frame::Frame;
use crate::observability::{record_frame_dropped, trace_frame_dropped, trace_frame_queued};
use crate::temporal::{Alignment, AlignmentStrategy, LogoHeads, Timestamp};
use std::collections::VecDeque;

/// Default maximum number of frames held per queue.
pub const DEFAULT_MAX_QUEUED: usize = 64;

/// Configuration for a [`FrameSync`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time base of input frame timestamps.
    pub input_time_base: Rational,
    /// Time base of logo frame timestamps.
    pub logo_time_base: Rational,
    /// Rule for pairing heads.
    pub strategy: AlignmentStrategy,
    /// Maximum number of frames per queue; the oldest is dropped beyond it.
    pub max_queued: usize,
    /// Log every queued frame at trace level.
    pub log_frames: bool,
    /// Label used in logs and metrics.
    pub name: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            input_time_base: Rational::MILLIS,
            logo_time_base: Rational::MILLIS,
            strategy: AlignmentStrategy::default(),
            max_queued: DEFAULT_MAX_QUEUED,
            log_frames: false,
            name: "tmblock".to_string(),
        }
    }
}

impl SyncConfig {
    /// Set both time bases.
    pub fn with_time_bases(mut self, input: Rational, logo: Rational) -> Self {
        self.input_time_base = input;
        self.logo_time_base = logo;
        self
    }

    /// Set the alignment strategy.
    pub fn with_strategy(mut self, strategy: AlignmentStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the maximum queue size.
    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued.max(1);
        self
    }

    /// Set the label used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// One input frame and the logo frame judged to belong to it.
#[derive(Debug)]
pub struct AlignedPair {
    /// Frame from the input stream.
    pub input: Frame,
    /// Frame from the logo stream.
    pub logo: Frame,
}

/// Result of asking the synchronizer for the next event.
#[derive(Debug)]
pub enum SyncEvent {
    /// Both streams have a frame for the same timeline position.
    Pair(AlignedPair),
    /// More frames are needed before anything can be decided.
    Pending,
    /// No pair will ever be produced again.
    EndOfStream,
}

/// Counters kept by the synchronizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Pairs emitted.
    pub paired: u64,
    /// Input frames released without being paired.
    pub dropped_input: u64,
    /// Logo frames released without being paired.
    pub dropped_logo: u64,
}

struct Queued {
    timestamp: Timestamp,
    frame: Frame,
}

struct PendingQueue {
    stream: &'static str,
    time_base: Rational,
    frames: VecDeque<Queued>,
    last_pts: Option<i64>,
    ended: bool,
    dropped: u64,
}

impl PendingQueue {
    fn new(stream: &'static str, time_base: Rational) -> Self {
        Self {
            stream,
            time_base,
            frames: VecDeque::new(),
            last_pts: None,
            ended: false,
            dropped: 0,
        }
    }

    fn head(&self) -> Option<Timestamp> {
        self.frames.front().map(|q| q.timestamp)
    }

    fn second(&self) -> Option<Timestamp> {
        self.frames.get(1).map(|q| q.timestamp)
    }

    fn exhausted(&self) -> bool {
        self.ended && self.frames.is_empty()
    }

    fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front().map(|q| q.frame)
    }

    fn drop_front(&mut self, pipeline: &str, reason: &'static str) {
        if let Some(queued) = self.frames.pop_front() {
            self.note_dropped(pipeline, queued.frame.pts(), reason);
        }
    }

    fn note_dropped(&mut self, pipeline: &str, pts: Option<i64>, reason: &'static str) {
        self.dropped += 1;
        trace_frame_dropped(pipeline, self.stream, pts, reason);
        record_frame_dropped(pipeline, self.stream, reason);
    }

    fn discard_all(&mut self) -> usize {
        let count = self.frames.len();
        self.frames.clear();
        count
    }
}

/// Pairs frames from the input and logo streams by timestamp.
///
/// The synchronizer owns every frame it has accepted until it either hands
/// it out in an [`AlignedPair`] or drops it. [`FrameSync::discard_all`]
/// releases whatever is still queued and may be called any number of times.
pub struct FrameSync {
    input: PendingQueue,
    logo: PendingQueue,
    strategy: AlignmentStrategy,
    max_queued: usize,
    log_frames: bool,
    name: String,
    paired: u64,
    finished: bool,
}

impl FrameSync {
    /// Create a synchronizer with empty queues.
    pub fn new(config: SyncConfig) -> Self {
        Self {
            input: PendingQueue::new("input", config.input_time_base),
            logo: PendingQueue::new("logo", config.logo_time_base),
            strategy: config.strategy,
            max_queued: config.max_queued.max(1),
            log_frames: config.log_frames,
            name: config.name,
            paired: 0,
            finished: false,
        }
    }

    /// Queue a frame from the input stream.
    ///
    /// # Errors
    ///
    /// The frame is released and an error returned if it has no timestamp,
    /// its timestamp is older than the previous input frame's, or the input
    /// stream already ended.
    pub fn push_input(&mut self, frame: Frame) -> Result<()> {
        self.push(Stream::Input, frame)
    }

    /// Queue a frame from the logo stream.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FrameSync::push_input`].
    pub fn push_logo(&mut self, frame: Frame) -> Result<()> {
        self.push(Stream::Logo, frame)
    }

    /// Mark the input stream as ended.
    pub fn end_input(&mut self) {
        self.input.ended = true;
    }

    /// Mark the logo stream as ended.
    pub fn end_logo(&mut self) {
        self.logo.ended = true;
    }

    fn push(&mut self, stream: Stream, frame: Frame) -> Result<()> {
        let name = self.name.as_str();
        let queue = match stream {
            Stream::Input => &mut self.input,
            Stream::Logo => &mut self.logo,
        };

        if queue.ended {
            return Err(Error::StreamEnded {
                stream: queue.stream,
            });
        }
        let Some(pts) = frame.pts() else {
            return Err(Error::MissingTimestamp {
                stream: queue.stream,
            });
        };
        if let Some(last) = queue.last_pts.filter(|&last| pts < last) {
            return Err(Error::NonMonotonicTimestamp {
                stream: queue.stream,
                pts,
                last,
            });
        }
        queue.last_pts = Some(pts);

        if self.finished {
            queue.note_dropped(name, Some(pts), "after end of stream");
            return Ok(());
        }

        if queue.frames.len() >= self.max_queued {
            tracing::warn!(
                pipeline = %name,
                stream = %queue.stream,
                max_queued = self.max_queued,
                "pending queue full, dropping oldest frame"
            );
            queue.drop_front(name, "overflow");
        }

        let timestamp = Timestamp::from_pts(pts, queue.time_base);
        queue.frames.push_back(Queued { timestamp, frame });
        if self.log_frames {
            trace_frame_queued(name, queue.stream, Some(pts), queue.frames.len());
        }
        Ok(())
    }

    /// Advance both queues and report the next synchronization event.
    ///
    /// Once [`SyncEvent::EndOfStream`] has been returned, every later call
    /// returns it too.
    pub fn next_event(&mut self) -> SyncEvent {
        loop {
            if self.finished {
                return SyncEvent::EndOfStream;
            }
            if self.input.exhausted() || self.logo.exhausted() {
                self.finish();
                continue;
            }

            let (Some(input), Some(head)) = (self.input.head(), self.logo.head()) else {
                return SyncEvent::Pending;
            };
            let heads = LogoHeads {
                head,
                next: self.logo.second(),
                ended: self.logo.ended,
            };

            match self.strategy.align(input, heads) {
                Alignment::Match => {
                    if let (Some(input), Some(logo)) = (self.input.pop(), self.logo.pop()) {
                        self.paired += 1;
                        return SyncEvent::Pair(AlignedPair { input, logo });
                    }
                }
                Alignment::DropInput => self.input.drop_front(&self.name, "behind logo"),
                Alignment::DropLogo => self.logo.drop_front(&self.name, "behind input"),
                Alignment::Wait => return SyncEvent::Pending,
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        let released = self.discard_all();
        tracing::debug!(
            pipeline = %self.name,
            released = released,
            paired = self.paired,
            "synchronizer reached end of stream"
        );
    }

    /// Release every queued frame. Returns how many frames were released.
    ///
    /// Idempotent: a second call finds empty queues and releases nothing.
    pub fn discard_all(&mut self) -> usize {
        self.input.discard_all() + self.logo.discard_all()
    }

    /// Whether end of stream has been reached.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of queued input frames.
    pub fn input_len(&self) -> usize {
        self.input.frames.len()
    }

    /// Number of queued logo frames.
    pub fn logo_len(&self) -> usize {
        self.logo.frames.len()
    }

    /// Check if both queues are empty.
    pub fn is_empty(&self) -> bool {
        self.input.frames.is_empty() && self.logo.frames.is_empty()
    }

    /// Counters for pairs and dropped frames.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            paired: self.paired,
            dropped_input: self.input.dropped,
            dropped_logo: self.logo.dropped,
        }
    }
}

#[derive(Clone, Copy)]
enum Stream {
    Input,
    Logo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::PixelFormat;
    use crate::metadata::Metadata;
    use std::time::Duration;

    fn input(pts: i64) -> Frame {
        Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(pts)).unwrap()
    }

    fn logo(pts: i64) -> Frame {
        Frame::alloc(2, 2, PixelFormat::Rgba, Metadata::with_pts(pts)).unwrap()
    }

    fn exact() -> FrameSync {
        FrameSync::new(SyncConfig::default().with_strategy(AlignmentStrategy::Exact))
    }

    fn expect_pair(sync: &mut FrameSync) -> AlignedPair {
        match sync.next_event() {
            SyncEvent::Pair(pair) => pair,
            other => panic!("Expected Pair, got {:?}", other),
        }
    }

    #[test]
    fn test_pair_on_equal_timestamps() {
        let mut sync = exact();
        sync.push_input(input(0)).unwrap();
        sync.push_logo(logo(0)).unwrap();

        let pair = expect_pair(&mut sync);
        assert_eq!(pair.input.width(), 4);
        assert_eq!(pair.logo.width(), 2);
        assert!(sync.is_empty());
        assert_eq!(sync.stats().paired, 1);
    }

    #[test]
    fn test_pending_until_both_streams_have_frames() {
        let mut sync = exact();
        assert!(matches!(sync.next_event(), SyncEvent::Pending));
        sync.push_input(input(0)).unwrap();
        assert!(matches!(sync.next_event(), SyncEvent::Pending));
        sync.push_logo(logo(0)).unwrap();
        expect_pair(&mut sync);
    }

    #[test]
    fn test_frames_behind_are_discarded() {
        let mut sync = exact();
        sync.push_input(input(0)).unwrap();
        sync.push_input(input(40)).unwrap();
        sync.push_logo(logo(40)).unwrap();

        let pair = expect_pair(&mut sync);
        assert_eq!(pair.input.pts(), Some(40));
        assert_eq!(sync.stats().dropped_input, 1);
    }

    #[test]
    fn test_time_bases_are_rescaled() {
        let mut sync = FrameSync::new(
            SyncConfig::default()
                .with_strategy(AlignmentStrategy::Exact)
                .with_time_bases(Rational::new(1, 25), Rational::MPEG),
        );
        sync.push_input(input(2)).unwrap();
        sync.push_logo(logo(7_200)).unwrap();

        let pair = expect_pair(&mut sync);
        assert_eq!(pair.input.pts(), Some(2));
        assert_eq!(pair.logo.pts(), Some(7_200));
    }

    #[test]
    fn test_nearest_picks_closest_logo() {
        let mut sync = FrameSync::new(
            SyncConfig::default()
                .with_strategy(AlignmentStrategy::Nearest(Duration::from_millis(30))),
        );
        sync.push_logo(logo(70)).unwrap();
        sync.push_logo(logo(95)).unwrap();
        sync.push_logo(logo(120)).unwrap();
        sync.push_input(input(100)).unwrap();

        let pair = expect_pair(&mut sync);
        assert_eq!(pair.logo.pts(), Some(95));
        assert_eq!(sync.stats().dropped_logo, 1);
        assert_eq!(sync.logo_len(), 1);
    }

    #[test]
    fn test_end_of_stream_is_terminal() {
        let mut sync = exact();
        sync.push_input(input(0)).unwrap();
        sync.end_logo();

        assert!(matches!(sync.next_event(), SyncEvent::EndOfStream));
        assert!(sync.is_finished());
        assert!(sync.is_empty());

        sync.push_input(input(40)).unwrap();
        assert!(matches!(sync.next_event(), SyncEvent::EndOfStream));
        assert_eq!(sync.input_len(), 0);
    }

    #[test]
    fn test_remaining_pairs_drain_before_end() {
        let mut sync = exact();
        sync.push_input(input(0)).unwrap();
        sync.push_logo(logo(0)).unwrap();
        sync.end_input();
        sync.end_logo();

        expect_pair(&mut sync);
        assert!(matches!(sync.next_event(), SyncEvent::EndOfStream));
    }

    #[test]
    fn test_push_validation() {
        let mut sync = exact();
        let untimed = Frame::alloc(1, 1, PixelFormat::Rgb24, Metadata::new()).unwrap();
        assert!(matches!(
            sync.push_input(untimed),
            Err(Error::MissingTimestamp { stream: "input" })
        ));

        sync.push_logo(logo(10)).unwrap();
        assert!(matches!(
            sync.push_logo(logo(5)),
            Err(Error::NonMonotonicTimestamp { pts: 5, last: 10, .. })
        ));

        sync.end_logo();
        assert!(matches!(
            sync.push_logo(logo(20)),
            Err(Error::StreamEnded { stream: "logo" })
        ));
        assert_eq!(sync.logo_len(), 1);
    }

    #[test]
    fn test_overflow_drops_oldest() {
        let mut sync = FrameSync::new(SyncConfig::default().with_max_queued(2));
        sync.push_input(input(0)).unwrap();
        sync.push_input(input(40)).unwrap();
        sync.push_input(input(80)).unwrap();

        assert_eq!(sync.input_len(), 2);
        assert_eq!(sync.stats().dropped_input, 1);
    }

    #[test]
    fn test_discard_all_idempotent() {
        let mut sync = exact();
        sync.push_input(input(0)).unwrap();
        sync.push_input(input(40)).unwrap();
        sync.push_logo(logo(100)).unwrap();

        assert_eq!(sync.discard_all(), 3);
        assert_eq!(sync.discard_all(), 0);
        assert!(sync.is_empty());
    }
}
