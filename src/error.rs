//! Error types for tmblock.

use thiserror::Error;

/// Result type alias using tmblock's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for tmblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The operation selector or another init-time setting is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A key/value option could not be applied.
    #[error("invalid option {key}={value}: {reason}")]
    InvalidOption {
        /// Option key.
        key: String,
        /// Offending value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A stream declared a pixel format the pipeline cannot accept.
    #[error("format negotiation failed on {stream}: {reason}")]
    NegotiationFailed {
        /// Stream name ("input" or "logo").
        stream: &'static str,
        /// What was wrong with the declared format.
        reason: String,
    },

    /// A frame's pixel format has no picture descriptor mapping.
    #[error("unsupported pixel layout: {0:?}")]
    UnsupportedLayout(crate::format::PixelFormat),

    /// Frame geometry does not fit its backing memory.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Output buffer allocation failed.
    #[error("out of memory: could not allocate {requested} bytes")]
    OutOfMemory {
        /// Requested allocation size in bytes.
        requested: usize,
    },

    /// The watermark operation returned a non-zero status.
    #[error("{operation} operation failed with status {status}")]
    OperationFailed {
        /// Name of the bound operation.
        operation: &'static str,
        /// Status code returned by the operation.
        status: i32,
    },

    /// A frame was pushed without a presentation timestamp.
    #[error("{stream} frame has no presentation timestamp")]
    MissingTimestamp {
        /// Stream name.
        stream: &'static str,
    },

    /// A frame's timestamp moved backwards on its stream.
    #[error("{stream} timestamp went backwards: {pts} after {last}")]
    NonMonotonicTimestamp {
        /// Stream name.
        stream: &'static str,
        /// Rejected timestamp, in stream time base units.
        pts: i64,
        /// Last accepted timestamp.
        last: i64,
    },

    /// A frame was pushed to a stream that already ended.
    #[error("{stream} stream already ended")]
    StreamEnded {
        /// Stream name.
        stream: &'static str,
    },

    /// The downstream sink refused a frame.
    #[error("forwarding failed: {0}")]
    Forward(String),

    /// Frames were processed before an operation was bound.
    #[error("pipeline not initialized")]
    NotInitialized,

    /// The pipeline already terminated because of an earlier failure.
    #[error("pipeline terminated")]
    Terminated,
}

impl Error {
    /// Whether this error only affects the event it happened in.
    ///
    /// Allocation failures may leave the pipeline usable if the host allows it.
    pub fn is_per_event(&self) -> bool {
        matches!(self, Error::OutOfMemory { .. })
    }
}
