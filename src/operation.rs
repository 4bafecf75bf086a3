//! Watermark operations and the dispatcher that invokes them.
//!
//! The pixel algorithms themselves live outside this crate. They are
//! supplied as an [`OperationSet`]; the [`Dispatcher`] binds exactly one of
//! them at initialization and calls it for every aligned pair.

use crate::bridge::{Picture, PictureMut};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Where the logo is anchored on the input frame, in pixels.
///
/// Values are not range-checked; interpreting offsets that fall outside the
/// frame is up to the operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Offset {
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset.
    pub y: i32,
}

impl Offset {
    /// Create a new offset.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Which watermark operation a pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OperationSelector {
    /// Embed the watermark.
    #[default]
    Embed,
    /// Remove the watermark by pre-processing.
    PreProcess,
    /// Remove the watermark by post-processing.
    PostProcess,
}

impl OperationSelector {
    /// All selectors, in index order.
    pub const ALL: [OperationSelector; 3] = [
        OperationSelector::Embed,
        OperationSelector::PreProcess,
        OperationSelector::PostProcess,
    ];

    /// Option name of this selector.
    pub const fn name(&self) -> &'static str {
        match self {
            OperationSelector::Embed => "embed",
            OperationSelector::PreProcess => "pre",
            OperationSelector::PostProcess => "post",
        }
    }

    /// Numeric index of this selector.
    pub const fn index(&self) -> i64 {
        match self {
            OperationSelector::Embed => 0,
            OperationSelector::PreProcess => 1,
            OperationSelector::PostProcess => 2,
        }
    }
}

impl TryFrom<i64> for OperationSelector {
    type Error = Error;

    fn try_from(index: i64) -> Result<Self> {
        match index {
            0 => Ok(OperationSelector::Embed),
            1 => Ok(OperationSelector::PreProcess),
            2 => Ok(OperationSelector::PostProcess),
            other => Err(Error::InvalidConfiguration(format!(
                "operation selector {} out of range 0..=2",
                other
            ))),
        }
    }
}

impl FromStr for OperationSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "embed" => Ok(OperationSelector::Embed),
            "pre" => Ok(OperationSelector::PreProcess),
            "post" => Ok(OperationSelector::PostProcess),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown operation {:?} (expected embed, pre or post)",
                other
            ))),
        }
    }
}

impl fmt::Display for OperationSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An externally supplied watermark algorithm.
///
/// The operation reads `input` and `logo`, and writes the whole of `output`.
/// It returns a status code: 0 for success, anything else for failure.
pub trait WatermarkOperation: Send {
    /// Run the operation on one aligned pair.
    fn apply(
        &mut self,
        input: &Picture<'_>,
        logo: &Picture<'_>,
        offset: Offset,
        output: &mut PictureMut<'_>,
    ) -> i32;
}

/// Adapter that turns a closure into a [`WatermarkOperation`].
///
/// # Example
///
/// ```rust
/// use tmblock::operation::{FnOperation, WatermarkOperation};
///
/// let op = FnOperation::new(|input, _logo, _offset, output| {
///     for y in 0..input.height {
///         output.row_mut(y).copy_from_slice(input.row(y));
///     }
///     0
/// });
/// let _boxed: Box<dyn WatermarkOperation> = Box::new(op);
/// ```
pub struct FnOperation<F> {
    func: F,
}

impl<F> FnOperation<F>
where
    F: FnMut(&Picture<'_>, &Picture<'_>, Offset, &mut PictureMut<'_>) -> i32 + Send,
{
    /// Wrap a closure.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> WatermarkOperation for FnOperation<F>
where
    F: FnMut(&Picture<'_>, &Picture<'_>, Offset, &mut PictureMut<'_>) -> i32 + Send,
{
    fn apply(
        &mut self,
        input: &Picture<'_>,
        logo: &Picture<'_>,
        offset: Offset,
        output: &mut PictureMut<'_>,
    ) -> i32 {
        (self.func)(input, logo, offset, output)
    }
}

/// The three operations provided by a watermark library.
pub struct OperationSet {
    /// Embeds the watermark.
    pub embed: Box<dyn WatermarkOperation>,
    /// Removes the watermark, pre-processing variant.
    pub pre: Box<dyn WatermarkOperation>,
    /// Removes the watermark, post-processing variant.
    pub post: Box<dyn WatermarkOperation>,
}

impl OperationSet {
    /// Bundle three operations.
    pub fn new(
        embed: impl WatermarkOperation + 'static,
        pre: impl WatermarkOperation + 'static,
        post: impl WatermarkOperation + 'static,
    ) -> Self {
        Self {
            embed: Box::new(embed),
            pre: Box::new(pre),
            post: Box::new(post),
        }
    }

    /// Take the operation for `selector`, dropping the other two.
    pub fn take(self, selector: OperationSelector) -> Box<dyn WatermarkOperation> {
        match selector {
            OperationSelector::Embed => self.embed,
            OperationSelector::PreProcess => self.pre,
            OperationSelector::PostProcess => self.post,
        }
    }
}

/// Holds the bound operation and the logo offset.
pub struct Dispatcher {
    selector: OperationSelector,
    offset: Offset,
    operation: Box<dyn WatermarkOperation>,
}

impl Dispatcher {
    /// Bind the operation chosen by `selector`.
    pub fn bind(selector: OperationSelector, offset: Offset, operations: OperationSet) -> Self {
        tracing::debug!(
            operation = %selector,
            x = offset.x,
            y = offset.y,
            "bound watermark operation"
        );
        Self {
            selector,
            offset,
            operation: operations.take(selector),
        }
    }

    /// The bound selector.
    pub fn selector(&self) -> OperationSelector {
        self.selector
    }

    /// The configured offset.
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Run the bound operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the operation returns a non-zero
    /// status. The output picture's contents are unspecified in that case.
    pub fn apply(
        &mut self,
        input: &Picture<'_>,
        logo: &Picture<'_>,
        output: &mut PictureMut<'_>,
    ) -> Result<()> {
        match self.operation.apply(input, logo, self.offset, output) {
            0 => Ok(()),
            status => Err(Error::OperationFailed {
                operation: self.selector.name(),
                status,
            }),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("selector", &self.selector)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{picture, picture_mut};
    use crate::format::PixelFormat;
    use crate::frame::Frame;
    use crate::metadata::Metadata;

    fn fill(value: u8) -> impl WatermarkOperation {
        FnOperation::new(move |_, _, _, out| {
            out.data.fill(value);
            0
        })
    }

    fn operations() -> OperationSet {
        OperationSet::new(fill(1), fill(2), fill(3))
    }

    fn run(dispatcher: &mut Dispatcher) -> Result<Frame> {
        let input = Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0))?;
        let logo = Frame::alloc(2, 2, PixelFormat::Rgba, Metadata::with_pts(0))?;
        let mut output = Frame::alloc(4, 4, PixelFormat::Rgb24, Metadata::with_pts(0))?;
        {
            let mut out = picture_mut(&mut output)?;
            dispatcher.apply(&picture(&input)?, &picture(&logo)?, &mut out)?;
        }
        Ok(output)
    }

    #[test]
    fn test_selector_from_index() {
        for selector in OperationSelector::ALL {
            assert_eq!(OperationSelector::try_from(selector.index()).unwrap(), selector);
        }
        assert!(matches!(
            OperationSelector::try_from(3),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            OperationSelector::try_from(-1),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_selector_from_str() {
        assert_eq!("embed".parse::<OperationSelector>().unwrap(), OperationSelector::Embed);
        assert_eq!("pre".parse::<OperationSelector>().unwrap(), OperationSelector::PreProcess);
        assert_eq!("post".parse::<OperationSelector>().unwrap(), OperationSelector::PostProcess);
        assert!("blur".parse::<OperationSelector>().is_err());
        assert_eq!(OperationSelector::default(), OperationSelector::Embed);
    }

    #[test]
    fn test_each_selector_binds_its_own_operation() {
        for (selector, expected) in OperationSelector::ALL.into_iter().zip([1u8, 2, 3]) {
            let mut dispatcher = Dispatcher::bind(selector, Offset::default(), operations());
            let output = run(&mut dispatcher).unwrap();
            assert!(output.data().iter().all(|&b| b == expected), "{}", selector);
        }
    }

    #[test]
    fn test_offset_is_passed_through() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(None));
        let record = std::sync::Arc::clone(&seen);
        let embed = FnOperation::new(move |_, _, offset, _| {
            *record.lock().unwrap() = Some(offset);
            0
        });
        let set = OperationSet::new(embed, fill(0), fill(0));
        let mut dispatcher = Dispatcher::bind(OperationSelector::Embed, Offset::new(-3, 7), set);

        run(&mut dispatcher).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(Offset::new(-3, 7)));
    }

    #[test]
    fn test_nonzero_status_fails() {
        let failing = FnOperation::new(|_, _, _, _| -22);
        let set = OperationSet::new(fill(0), failing, fill(0));
        let mut dispatcher = Dispatcher::bind(OperationSelector::PreProcess, Offset::default(), set);

        match run(&mut dispatcher) {
            Err(Error::OperationFailed { operation, status }) => {
                assert_eq!(operation, "pre");
                assert_eq!(status, -22);
            }
            other => panic!("Expected OperationFailed, got {:?}", other),
        }
    }
}
