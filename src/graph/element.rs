//! User-supplied work attached to a graph node.

use tracing::warn;

use crate::status::StatusCode;

/// Work executed by a node.
///
/// `init` runs once before the first `run`, `run` repeats up to the node's
/// loop count each time the node is released, and `destroy` runs once at
/// graph teardown. Bodies may block; the runner executes them on dedicated
/// blocking workers.
pub trait Element: Send + 'static {
    fn init(&mut self) -> StatusCode {
        StatusCode::ok()
    }

    fn run(&mut self) -> StatusCode;

    fn destroy(&mut self) -> StatusCode {
        StatusCode::ok()
    }
}

impl Element for Box<dyn Element> {
    fn init(&mut self) -> StatusCode {
        (**self).init()
    }

    fn run(&mut self) -> StatusCode {
        (**self).run()
    }

    fn destroy(&mut self) -> StatusCode {
        (**self).destroy()
    }
}

/// Wraps a closure returning a [`StatusCode`] as an element body.
pub struct FnElement<F> {
    func: F,
}

impl<F> FnElement<F>
where
    F: FnMut() -> StatusCode + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Element for FnElement<F>
where
    F: FnMut() -> StatusCode + Send + 'static,
{
    fn run(&mut self) -> StatusCode {
        (self.func)()
    }
}

/// Wraps a fallible closure. `Err` becomes an error status with code
/// [`TryFnElement::FAILED_CODE`].
pub struct TryFnElement<F> {
    label: String,
    func: F,
}

impl<F> TryFnElement<F>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    pub const FAILED_CODE: &'static str = "ELEMENT_FAILED";
    pub const FAILED_KEY: &'static str = "element.failed";

    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<F> Element for TryFnElement<F>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    fn run(&mut self) -> StatusCode {
        match (self.func)() {
            Ok(()) => StatusCode::ok(),
            Err(e) => {
                warn!(element = %self.label, error = %e, "element body returned an error");
                StatusCode::error(Self::FAILED_CODE, Self::FAILED_KEY)
            }
        }
    }
}
