//! Tracing integration for structured logging and spans.

use tracing::{Level, Span, span};

/// Configuration for tracing behavior.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Whether to create a span around every processing step.
    pub step_spans: bool,
    /// Whether to log every frame pushed into a queue.
    pub frame_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            step_spans: true,
            frame_events: false, // one line per frame is noisy
        }
    }
}

impl TracingConfig {
    /// Enable everything.
    pub fn all() -> Self {
        Self {
            step_spans: true,
            frame_events: true,
        }
    }

    /// Disable all optional spans and events.
    pub fn none() -> Self {
        Self {
            step_spans: false,
            frame_events: false,
        }
    }
}

/// Create a span for one pipeline.
#[inline]
pub fn span_pipeline(name: &str) -> Span {
    span!(Level::INFO, "pipeline", name = %name)
}

/// Create a span for one processing step.
#[inline]
pub fn span_step(pipeline: &str, operation: &str) -> Span {
    span!(
        Level::DEBUG,
        "step",
        pipeline = %pipeline,
        operation = %operation
    )
}

/// Log a frame entering a pending queue.
#[inline]
pub fn trace_frame_queued(pipeline: &str, stream: &str, pts: Option<i64>, depth: usize) {
    tracing::trace!(
        pipeline = %pipeline,
        stream = %stream,
        pts = ?pts,
        depth = depth,
        "frame queued"
    );
}

/// Log a frame released without being paired.
#[inline]
pub fn trace_frame_dropped(pipeline: &str, stream: &str, pts: Option<i64>, reason: &str) {
    tracing::debug!(
        pipeline = %pipeline,
        stream = %stream,
        pts = ?pts,
        reason = %reason,
        "frame dropped"
    );
}

/// Log an abandoned event.
#[inline]
pub fn trace_error(pipeline: &str, error: &dyn std::error::Error) {
    tracing::error!(
        pipeline = %pipeline,
        error = %error,
        "event abandoned"
    );
}

/// Log end-of-stream.
#[inline]
pub fn trace_eos(pipeline: &str, forwarded: u64) {
    tracing::info!(
        pipeline = %pipeline,
        forwarded = forwarded,
        "end of stream"
    );
}

/// Log pipeline state change.
#[inline]
pub fn trace_state_change(pipeline: &str, from: &str, to: &str) {
    tracing::debug!(
        pipeline = %pipeline,
        from = %from,
        to = %to,
        "pipeline state changed"
    );
}
