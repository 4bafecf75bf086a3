//! Pipeline controller.
//!
//! Ties the synchronizer, the output allocator and the operation dispatcher
//! together and drives them one synchronization event at a time.
//!
//! ```text
//!   Idle ──initialize──► Ready ──pair──► Processing ──forwarded──► Ready
//!    │                     │                  │
//!    └──invalid selector───┴──end of stream───┴──failure──► Terminated
//! ```
//!
//! Every transition into `Terminated` releases both pending queues. Frames of
//! an abandoned event are owned by the step that failed and are released
//! before it returns.
//!
//! # Example
//!
//! ```rust
//! use std::sync::mpsc;
//! use tmblock::format::{PixelFormat, VideoFormat};
//! use tmblock::frame::Frame;
//! use tmblock::metadata::Metadata;
//! use tmblock::operation::{FnOperation, OperationSet};
//! use tmblock::{Pipeline, PipelineConfig, Step};
//!
//! let copy = || FnOperation::new(|input, _logo, _offset, output| {
//!     for y in 0..input.height {
//!         output.row_mut(y).copy_from_slice(input.row(y));
//!     }
//!     0
//! });
//!
//! let config = PipelineConfig::new(
//!     VideoFormat::new(4, 4, PixelFormat::Rgb24),
//!     VideoFormat::new(2, 2, PixelFormat::Rgba),
//! );
//! let (tx, rx) = mpsc::channel::<Frame>();
//! let mut pipeline = Pipeline::new(config, tx).unwrap();
//! pipeline.initialize(OperationSet::new(copy(), copy(), copy())).unwrap();
//!
//! pipeline.push_input(Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0)).unwrap()).unwrap();
//! pipeline.push_logo(Frame::alloc(2, 2, PixelFormat::Rgba, Metadata::with_pts(0)).unwrap()).unwrap();
//!
//! assert_eq!(pipeline.step().unwrap(), Step::Forwarded);
//! assert_eq!(rx.try_recv().unwrap().pts(), Some(0));
//! ```

use crate::allocator::OutputAllocator;
use crate::bridge::{picture, picture_mut};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::format::{PixelFormat, VideoFormat};
use crate::frame::Frame;
use crate::memory::SegmentAllocator;
use crate::observability::{
    PipelineMetrics, init_metrics, span_pipeline, span_step, trace_eos, trace_error,
    trace_frame_dropped, trace_state_change,
};
use crate::operation::{Dispatcher, OperationSelector, OperationSet};
use crate::sync::{AlignedPair, FrameSync, SyncEvent, SyncStats};
use std::fmt;
use std::sync::mpsc;
use std::time::Instant;
use tracing::Span;

// ============================================================================
// Sink
// ============================================================================

/// Downstream consumer of output frames.
pub trait FrameSink: Send {
    /// Take ownership of one output frame.
    fn consume(&mut self, frame: Frame) -> Result<()>;
}

impl<F> FrameSink for F
where
    F: FnMut(Frame) -> Result<()> + Send,
{
    fn consume(&mut self, frame: Frame) -> Result<()> {
        self(frame)
    }
}

impl FrameSink for mpsc::Sender<Frame> {
    fn consume(&mut self, frame: Frame) -> Result<()> {
        self.send(frame)
            .map_err(|_| Error::Forward("output channel disconnected".to_string()))
    }
}

// ============================================================================
// State
// ============================================================================

/// Lifecycle state of a [`Pipeline`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PipelineState {
    /// Formats negotiated, no operation bound yet.
    #[default]
    Idle,
    /// Waiting for the next synchronization event.
    Ready,
    /// Handling an aligned pair.
    Processing,
    /// Finished, either cleanly or after a failure.
    Terminated,
}

impl PipelineState {
    /// Name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Ready => "Ready",
            PipelineState::Processing => "Processing",
            PipelineState::Terminated => "Terminated",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of a single [`Pipeline::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// One output frame was forwarded to the sink.
    Forwarded,
    /// More frames are needed.
    Pending,
    /// The pipeline has ended; no more output will be produced.
    EndOfStream,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Watermark pipeline over an input and a logo stream.
pub struct Pipeline {
    config: PipelineConfig,
    state: PipelineState,
    failed: bool,
    sync: FrameSync,
    allocator: OutputAllocator,
    dispatcher: Option<Dispatcher>,
    sink: Box<dyn FrameSink>,
    metrics: PipelineMetrics,
    span: Span,
    forwarded: u64,
}

impl Pipeline {
    /// Negotiate stream formats and create an idle pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NegotiationFailed`] unless the input stream declares
    /// RGB24 and the logo stream declares RGBA, each with a non-empty size and
    /// a usable time base.
    pub fn new(config: PipelineConfig, sink: impl FrameSink + 'static) -> Result<Self> {
        negotiate("input", &config.input, PixelFormat::Rgb24)?;
        negotiate("logo", &config.logo, PixelFormat::Rgba)?;
        init_metrics();

        let span = span_pipeline(&config.name);
        let allocator =
            OutputAllocator::new(PixelFormat::Rgb24).with_stride_align(config.stride_align);

        tracing::debug!(
            pipeline = %config.name,
            input = ?config.input,
            logo = ?config.logo,
            "formats negotiated"
        );

        Ok(Self {
            sync: FrameSync::new(config.sync_config()),
            metrics: PipelineMetrics::new(&config.name),
            config,
            state: PipelineState::Idle,
            failed: false,
            allocator,
            dispatcher: None,
            sink: Box::new(sink),
            span,
            forwarded: 0,
        })
    }

    /// Draw output memory from `segments` instead of the heap.
    pub fn with_segment_allocator(mut self, segments: Box<dyn SegmentAllocator>) -> Self {
        self.allocator = OutputAllocator::with_segments(PixelFormat::Rgb24, segments)
            .with_stride_align(self.config.stride_align);
        self
    }

    /// Validate the operation selector and bind the chosen operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] for a selector outside 0..=2;
    /// the pipeline is terminated in that case. Calling this on a pipeline
    /// that is not idle also fails.
    pub fn initialize(&mut self, operations: OperationSet) -> Result<()> {
        match self.state {
            PipelineState::Idle => {}
            PipelineState::Terminated => return Err(Error::Terminated),
            _ => {
                return Err(Error::InvalidConfiguration(
                    "pipeline already initialized".to_string(),
                ));
            }
        }

        let selector = match OperationSelector::try_from(self.config.func) {
            Ok(selector) => selector,
            Err(err) => {
                trace_error(&self.config.name, &err);
                self.terminate(true);
                return Err(err);
            }
        };

        self.dispatcher = Some(Dispatcher::bind(selector, self.config.offset, operations));
        self.set_state(PipelineState::Ready);
        Ok(())
    }

    /// Hand an input frame to the synchronizer.
    ///
    /// # Errors
    ///
    /// See [`FrameSync::push_input`]. After a failure the frame is released
    /// and [`Error::Terminated`] is returned.
    pub fn push_input(&mut self, frame: Frame) -> Result<()> {
        if self.state == PipelineState::Terminated {
            return self.reject("input", frame);
        }
        self.sync.push_input(frame)?;
        self.record_queue_depth();
        Ok(())
    }

    /// Hand a logo frame to the synchronizer.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Pipeline::push_input`].
    pub fn push_logo(&mut self, frame: Frame) -> Result<()> {
        if self.state == PipelineState::Terminated {
            return self.reject("logo", frame);
        }
        self.sync.push_logo(frame)?;
        self.record_queue_depth();
        Ok(())
    }

    /// Signal that the input stream has ended.
    pub fn end_input(&mut self) {
        self.sync.end_input();
    }

    /// Signal that the logo stream has ended.
    pub fn end_logo(&mut self) {
        self.sync.end_logo();
    }

    fn reject(&self, stream: &'static str, frame: Frame) -> Result<()> {
        trace_frame_dropped(&self.config.name, stream, frame.pts(), "pipeline terminated");
        drop(frame);
        if self.failed {
            Err(Error::Terminated)
        } else {
            Ok(())
        }
    }

    /// Handle at most one synchronization event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInitialized`] before [`Pipeline::initialize`],
    /// and [`Error::Terminated`] once a previous step failed. Errors raised
    /// while processing a pair are returned after every frame of that pair
    /// has been released. A frame whose layout or size differs from what its
    /// stream negotiated fails the event with [`Error::UnsupportedLayout`] or
    /// [`Error::InvalidFrame`] before any output is allocated.
    pub fn step(&mut self) -> Result<Step> {
        match self.state {
            PipelineState::Idle => return Err(Error::NotInitialized),
            PipelineState::Terminated if self.failed => return Err(Error::Terminated),
            PipelineState::Terminated => return Ok(Step::EndOfStream),
            PipelineState::Ready | PipelineState::Processing => {}
        }

        let span = self.span.clone();
        let _guard = span.enter();

        let event = self.sync.next_event();
        self.record_queue_depth();

        match event {
            SyncEvent::Pending => Ok(Step::Pending),
            SyncEvent::EndOfStream => {
                trace_eos(&self.config.name, self.forwarded);
                self.terminate(false);
                Ok(Step::EndOfStream)
            }
            SyncEvent::Pair(pair) => {
                self.set_state(PipelineState::Processing);
                let start = Instant::now();

                match self.process(pair) {
                    Ok(()) => {
                        self.metrics.record_event(start.elapsed());
                        self.forwarded += 1;
                        self.set_state(PipelineState::Ready);
                        Ok(Step::Forwarded)
                    }
                    Err(err) => {
                        self.metrics.record_failure();
                        trace_error(&self.config.name, &err);
                        if err.is_per_event() && !self.config.abort_on_alloc_failure {
                            self.set_state(PipelineState::Ready);
                        } else {
                            self.terminate(true);
                        }
                        Err(err)
                    }
                }
            }
        }
    }

    fn process(&mut self, pair: AlignedPair) -> Result<()> {
        let AlignedPair { input, logo } = pair;
        let dispatcher = self.dispatcher.as_mut().ok_or(Error::NotInitialized)?;
        let _step = self
            .config
            .tracing
            .step_spans
            .then(|| span_step(&self.config.name, dispatcher.selector().name()).entered());

        check_frame("input", &input, &self.config.input)?;
        check_frame("logo", &logo, &self.config.logo)?;

        let mut output = self.allocator.allocate(&input)?;
        {
            let mut out = picture_mut(&mut output)?;
            dispatcher.apply(&picture(&input)?, &picture(&logo)?, &mut out)?;
        }

        tracing::trace!(
            pts = ?output.pts(),
            sequence = output.metadata().sequence,
            "forwarding output frame"
        );
        self.sink.consume(output)
    }

    /// Step until more frames are needed or the pipeline ends.
    ///
    /// Returns the number of frames forwarded by this call.
    ///
    /// # Errors
    ///
    /// Stops at the first failing step and returns its error.
    pub fn run(&mut self) -> Result<usize> {
        let mut forwarded = 0;
        loop {
            match self.step()? {
                Step::Forwarded => forwarded += 1,
                Step::Pending | Step::EndOfStream => return Ok(forwarded),
            }
        }
    }

    /// Release both pending queues and terminate. Idempotent.
    pub fn teardown(&mut self) {
        self.terminate(false);
    }

    fn terminate(&mut self, failed: bool) {
        self.failed |= failed;
        self.set_state(PipelineState::Terminated);
        let released = self.sync.discard_all();
        if released > 0 {
            tracing::debug!(
                pipeline = %self.config.name,
                released = released,
                "released pending frames"
            );
        }
        self.record_queue_depth();
    }

    fn set_state(&mut self, to: PipelineState) {
        if self.state != to {
            trace_state_change(&self.config.name, self.state.name(), to.name());
            self.state = to;
        }
    }

    fn record_queue_depth(&self) {
        self.metrics
            .record_queue_depth(self.sync.input_len(), self.sync.logo_len());
    }

    /// Format of the frames this pipeline forwards.
    pub fn output_format(&self) -> VideoFormat {
        VideoFormat {
            pixel_format: PixelFormat::Rgb24,
            ..self.config.input
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the pipeline terminated because of an error.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Number of frames forwarded so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Synchronizer counters.
    pub fn sync_stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Number of frames waiting in the input and logo queues.
    pub fn queued(&self) -> (usize, usize) {
        (self.sync.input_len(), self.sync.logo_len())
    }

    /// The configuration this pipeline was built from.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("failed", &self.failed)
            .field("dispatcher", &self.dispatcher)
            .field("forwarded", &self.forwarded)
            .finish_non_exhaustive()
    }
}

fn negotiate(stream: &'static str, format: &VideoFormat, expected: PixelFormat) -> Result<()> {
    if format.pixel_format != expected {
        return Err(Error::NegotiationFailed {
            stream,
            reason: format!("expected {}, got {}", expected, format.pixel_format),
        });
    }
    if format.width == 0 || format.height == 0 {
        return Err(Error::NegotiationFailed {
            stream,
            reason: format!("empty geometry {}x{}", format.width, format.height),
        });
    }
    if !format.time_base.is_valid() {
        return Err(Error::NegotiationFailed {
            stream,
            reason: format!("invalid time base {}", format.time_base),
        });
    }
    Ok(())
}

/// A frame must arrive in the layout and size its stream negotiated.
fn check_frame(stream: &'static str, frame: &Frame, declared: &VideoFormat) -> Result<()> {
    if frame.format() != declared.pixel_format {
        return Err(Error::UnsupportedLayout(frame.format()));
    }
    if (frame.width(), frame.height()) != (declared.width, declared.height) {
        return Err(Error::InvalidFrame(format!(
            "{} frame is {}x{}, negotiated {}x{}",
            stream,
            frame.width(),
            frame.height(),
            declared.width,
            declared.height
        )));
    }
    Ok(())
}
