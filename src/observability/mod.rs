//! Observability features: metrics and tracing.
//!
//! ## Metrics
//!
//! | Metric | Type | Description |
//! |--------|------|-------------|
//! | `tmblock_events_processed` | Counter | Events whose output was forwarded |
//! | `tmblock_events_failed` | Counter | Events abandoned because of an error |
//! | `tmblock_frames_dropped` | Counter | Frames released without being paired |
//! | `tmblock_frames_queued` | Gauge | Frames waiting per stream |
//! | `tmblock_processing_time_ns` | Histogram | Time per event |
//!
//! The crate never installs a recorder; hosts pick their own exporter.
//!
//! ## Tracing
//!
//! A `pipeline` span wraps each processing step, with a `step` span inside
//! when [`TracingConfig::step_spans`] is enabled.

mod metrics;
mod tracing_support;

pub use self::metrics::{PipelineMetrics, init_metrics, record_frame_dropped};
pub use self::tracing_support::{
    TracingConfig, span_pipeline, span_step, trace_eos, trace_error, trace_frame_dropped,
    trace_frame_queued, trace_state_change,
};
