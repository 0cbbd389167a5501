//! The view-rendering seam used by the render effect.

use reply_core::{BoxError, Locals};

/// Renders a named view with its locals into HTML.
///
/// Plain closures `Fn(&str, &Locals) -> Result<String, BoxError>` implement
/// this trait.
pub trait ViewEngine: Send + Sync {
    fn render(&self, view: &str, locals: &Locals) -> Result<String, BoxError>;
}

impl<F> ViewEngine for F
where
    F: Fn(&str, &Locals) -> Result<String, BoxError> + Send + Sync,
{
    fn render(&self, view: &str, locals: &Locals) -> Result<String, BoxError> {
        (self)(view, locals)
    }
}
