//! Temporal types for aligning the two streams.
//!
//! - [`Timestamp`]: Signed nanosecond position on the common timeline
//! - [`AlignmentStrategy`]: Rule deciding when two frames belong together
//!
//! Frames carry timestamps in their stream's own time base. They are
//! rescaled into [`Timestamp`]s before any comparison.

mod alignment;
mod timestamp;

pub use alignment::{Alignment, AlignmentStrategy, LogoHeads};
pub use timestamp::Timestamp;
