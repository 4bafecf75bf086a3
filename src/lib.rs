//! # tmblock
//!
//! A two-input video filter that pairs every input frame with a logo frame
//! by timestamp and runs a watermark operation over each pair.
//!
//! The watermark algorithms are supplied by the host as an
//! [`OperationSet`](operation::OperationSet). This crate handles the rest:
//! format negotiation, frame synchronization, output allocation, picture
//! descriptors for the operation, and releasing every frame exactly once.
//!
//! ## Features
//!
//! - **Move-only frames**: a frame is released when its owner drops it
//! - **Timestamp alignment**: exact or nearest-within-window pairing across
//!   streams with different time bases
//! - **Bounded queues**: the oldest pending frame is dropped on overflow
//! - **Observability**: `tracing` spans and events, `metrics` counters
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::mpsc;
//! use tmblock::prelude::*;
//!
//! let embed = || FnOperation::new(|_input, _logo, _offset, output| {
//!     output.data.fill(0x80);
//!     0
//! });
//!
//! let config = PipelineConfig::from_options([("x", "1"), ("y", "1"), ("func", "embed")])
//!     .unwrap();
//! let config = PipelineConfig {
//!     input: VideoFormat::new(4, 4, PixelFormat::Rgb24),
//!     logo: VideoFormat::new(2, 2, PixelFormat::Rgba),
//!     ..config
//! };
//!
//! let (tx, rx) = mpsc::channel::<Frame>();
//! let mut pipeline = Pipeline::new(config, tx).unwrap();
//! pipeline.initialize(OperationSet::new(embed(), embed(), embed())).unwrap();
//!
//! pipeline.push_input(Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0)).unwrap()).unwrap();
//! pipeline.push_logo(Frame::alloc(2, 2, PixelFormat::Rgba, Metadata::with_pts(0)).unwrap()).unwrap();
//! pipeline.end_input();
//! pipeline.end_logo();
//!
//! assert_eq!(pipeline.run().unwrap(), 1);
//! assert_eq!(pipeline.step().unwrap(), Step::EndOfStream);
//! assert_eq!(rx.try_recv().unwrap().width(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod allocator;
pub mod bridge;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod memory;
pub mod metadata;
pub mod observability;
pub mod operation;
pub mod pipeline;
pub mod sync;
pub mod temporal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bridge::{Picture, PictureLayout, PictureMut};
    pub use crate::config::PipelineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::format::{Framerate, PixelFormat, Rational, VideoFormat};
    pub use crate::frame::Frame;
    pub use crate::memory::{MemorySegment, MemoryType, SegmentAllocator};
    pub use crate::metadata::Metadata;
    pub use crate::operation::{
        FnOperation, Offset, OperationSelector, OperationSet, WatermarkOperation,
    };
    pub use crate::pipeline::{FrameSink, Pipeline, PipelineState, Step};
    pub use crate::temporal::AlignmentStrategy;
}

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, Step};
