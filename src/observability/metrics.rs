//! Metrics collection using metrics-rs.

use metrics::{Counter, Gauge, Histogram, Unit, counter, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Whether metrics have been initialized.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const EVENTS_PROCESSED: &str = "tmblock_events_processed";
const EVENTS_FAILED: &str = "tmblock_events_failed";
const FRAMES_DROPPED: &str = "tmblock_frames_dropped";
const FRAMES_QUEUED: &str = "tmblock_frames_queued";
const PROCESSING_TIME_NS: &str = "tmblock_processing_time_ns";

/// Initialize metrics descriptions.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    metrics::describe_counter!(
        EVENTS_PROCESSED,
        Unit::Count,
        "Synchronization events whose output was forwarded"
    );
    metrics::describe_counter!(
        EVENTS_FAILED,
        Unit::Count,
        "Synchronization events abandoned because of an error"
    );
    metrics::describe_counter!(
        FRAMES_DROPPED,
        Unit::Count,
        "Frames released without being paired"
    );
    metrics::describe_gauge!(
        FRAMES_QUEUED,
        Unit::Count,
        "Frames waiting in a pending queue"
    );
    metrics::describe_histogram!(
        PROCESSING_TIME_NS,
        Unit::Nanoseconds,
        "Time spent on one synchronization event"
    );
}

/// Record a frame released without being paired.
#[inline]
pub fn record_frame_dropped(pipeline: &str, stream: &'static str, reason: &'static str) {
    counter!(
        FRAMES_DROPPED,
        "pipeline" => pipeline.to_string(),
        "stream" => stream,
        "reason" => reason
    )
    .increment(1);
}

/// Pre-labelled metric handles for one pipeline.
#[derive(Clone)]
pub struct PipelineMetrics {
    name: String,
    events_processed: Counter,
    events_failed: Counter,
    input_queued: Gauge,
    logo_queued: Gauge,
    processing_time: Histogram,
}

impl PipelineMetrics {
    /// Create the metric handles for a pipeline.
    pub fn new(pipeline: &str) -> Self {
        Self {
            name: pipeline.to_string(),
            events_processed: counter!(EVENTS_PROCESSED, "pipeline" => pipeline.to_string()),
            events_failed: counter!(EVENTS_FAILED, "pipeline" => pipeline.to_string()),
            input_queued: gauge!(
                FRAMES_QUEUED,
                "pipeline" => pipeline.to_string(),
                "stream" => "input"
            ),
            logo_queued: gauge!(
                FRAMES_QUEUED,
                "pipeline" => pipeline.to_string(),
                "stream" => "logo"
            ),
            processing_time: histogram!(PROCESSING_TIME_NS, "pipeline" => pipeline.to_string()),
        }
    }

    /// Pipeline name these handles are labelled with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a forwarded event and how long it took.
    #[inline]
    pub fn record_event(&self, duration: Duration) {
        self.events_processed.increment(1);
        self.processing_time.record(duration.as_nanos() as f64);
    }

    /// Record an abandoned event.
    #[inline]
    pub fn record_failure(&self) {
        self.events_failed.increment(1);
    }

    /// Record current queue depths.
    #[inline]
    pub fn record_queue_depth(&self, input: usize, logo: usize) {
        self.input_queued.set(input as f64);
        self.logo_queued.set(logo as f64);
    }
}

impl std::fmt::Debug for PipelineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineMetrics")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        init_metrics();
        init_metrics();
        assert!(METRICS_INITIALIZED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op.
        let metrics = PipelineMetrics::new("test");
        metrics.record_event(Duration::from_micros(5));
        metrics.record_failure();
        metrics.record_queue_depth(3, 1);
        record_frame_dropped("test", "logo", "overflow");
        assert_eq!(metrics.name(), "test");
    }
}
