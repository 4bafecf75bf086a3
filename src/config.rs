//! Pipeline configuration.
//!
//! Configuration is a plain struct with builder methods. Hosts that expose
//! filter options as strings can feed them through
//! [`PipelineConfig::set_option`]:
//!
//! | Key | Value | Default |
//! |-----|-------|---------|
//! | `x` | horizontal logo offset (i32) | `0` |
//! | `y` | vertical logo offset (i32) | `0` |
//! | `func` | `embed`, `pre`, `post` or an index | `embed` |
//! | `sync` | `exact`, `nearest` or `nearest:<ms>` | `nearest:20` |
//! | `queue` | maximum frames per pending queue | `64` |
//!
//! An out-of-range `func` index is accepted here and rejected when the
//! pipeline is initialized. Stream geometry is not an option: the default
//! formats are 0x0 and must be replaced before a pipeline will negotiate.

use crate::allocator::DEFAULT_STRIDE_ALIGN;
use crate::error::{Error, Result};
use crate::format::{PixelFormat, VideoFormat};
use crate::observability::TracingConfig;
use crate::operation::{Offset, OperationSelector};
use crate::sync::{DEFAULT_MAX_QUEUED, SyncConfig};
use crate::temporal::AlignmentStrategy;
use std::time::Duration;

/// Configuration for a [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Label used in logs and metrics.
    pub name: String,
    /// Where the logo is anchored on the input frame.
    pub offset: Offset,
    /// Operation selector index (0 embed, 1 pre, 2 post).
    pub func: i64,
    /// Declared format of the input stream.
    pub input: VideoFormat,
    /// Declared format of the logo stream.
    pub logo: VideoFormat,
    /// Rule for pairing input and logo frames.
    pub alignment: AlignmentStrategy,
    /// Maximum frames per pending queue.
    pub max_queued: usize,
    /// Terminate the pipeline when an output frame cannot be allocated.
    ///
    /// When false, only the affected event is abandoned.
    pub abort_on_alloc_failure: bool,
    /// Row alignment of output frames, in bytes.
    pub stride_align: usize,
    /// Span and event settings.
    pub tracing: TracingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "tmblock".to_string(),
            offset: Offset::default(),
            func: OperationSelector::default().index(),
            input: VideoFormat::new(0, 0, PixelFormat::Rgb24),
            logo: VideoFormat::new(0, 0, PixelFormat::Rgba),
            alignment: AlignmentStrategy::default(),
            max_queued: DEFAULT_MAX_QUEUED,
            abort_on_alloc_failure: true,
            stride_align: DEFAULT_STRIDE_ALIGN,
            tracing: TracingConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration for the given stream formats.
    pub fn new(input: VideoFormat, logo: VideoFormat) -> Self {
        Self {
            input,
            logo,
            ..Default::default()
        }
    }

    /// Build a configuration from key/value options.
    pub fn from_options<I, K, V>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in options {
            config.set_option(key.as_ref(), value.as_ref())?;
        }
        Ok(config)
    }

    /// Set the label used in logs and metrics.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the logo offset.
    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset = Offset::new(x, y);
        self
    }

    /// Select the operation.
    pub fn with_operation(mut self, selector: OperationSelector) -> Self {
        self.func = selector.index();
        self
    }

    /// Set the alignment strategy.
    pub fn with_alignment(mut self, alignment: AlignmentStrategy) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the maximum number of frames per pending queue.
    pub fn with_max_queued(mut self, max_queued: usize) -> Self {
        self.max_queued = max_queued;
        self
    }

    /// Keep running after an output allocation failure.
    pub fn with_abort_on_alloc_failure(mut self, abort: bool) -> Self {
        self.abort_on_alloc_failure = abort;
        self
    }

    /// Set the output row alignment.
    pub fn with_stride_align(mut self, align: usize) -> Self {
        self.stride_align = align;
        self
    }

    /// Set tracing behavior.
    pub fn with_tracing(mut self, tracing: TracingConfig) -> Self {
        self.tracing = tracing;
        self
    }

    /// Apply one key/value option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for unknown keys and unparsable values.
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        };

        match key {
            "x" => self.offset.x = value.parse().map_err(|_| invalid("expected an integer"))?,
            "y" => self.offset.y = value.parse().map_err(|_| invalid("expected an integer"))?,
            "func" => {
                self.func = match value.parse::<OperationSelector>() {
                    Ok(selector) => selector.index(),
                    Err(_) => value
                        .parse()
                        .map_err(|_| invalid("expected embed, pre, post or an index"))?,
                }
            }
            "sync" => {
                self.alignment = parse_alignment(value)
                    .ok_or_else(|| invalid("expected exact, nearest or nearest:<ms>"))?
            }
            "queue" => {
                self.max_queued = value
                    .parse()
                    .ok()
                    .filter(|&n: &usize| n > 0)
                    .ok_or_else(|| invalid("expected a positive integer"))?
            }
            _ => return Err(invalid("unknown option")),
        }
        Ok(())
    }

    /// Synchronizer settings derived from this configuration.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            input_time_base: self.input.time_base,
            logo_time_base: self.logo.time_base,
            strategy: self.alignment,
            max_queued: self.max_queued.max(1),
            log_frames: self.tracing.frame_events,
            name: self.name.clone(),
        }
    }
}

fn parse_alignment(value: &str) -> Option<AlignmentStrategy> {
    match value.split_once(':') {
        None if value == "exact" => Some(AlignmentStrategy::Exact),
        None if value == "nearest" => Some(AlignmentStrategy::default()),
        Some(("nearest", ms)) => ms
            .parse()
            .ok()
            .map(|ms| AlignmentStrategy::Nearest(Duration::from_millis(ms))),
        _ => None,
    }
}
