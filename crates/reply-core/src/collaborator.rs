//! Capabilities the adapter needs from the request, the response and the
//! continuation. None of them are implemented here; transports and test
//! doubles provide them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::result::{CookieOptions, Headers, Locals, Redirect};

/// The request collaborator.
///
/// Passed through to the handler untouched. The only capability the
/// adapter itself uses is [`Request::csrf_token`], and only when a
/// descriptor asks for a token.
pub trait Request: Clone + Send + Sync {
    /// Fetch a CSRF token for the current request.
    fn csrf_token(&self) -> Result<String> {
        Err(Error::CsrfUnavailable)
    }
}

/// A request with no capabilities.
impl Request for () {}

/// The response collaborator.
///
/// Methods take `&self`: a response is a handle shared between the adapter
/// and the handler, so implementations keep their state behind interior
/// mutability.
pub trait Response: Clone + Send + Sync {
    /// What the terminal effects hand back.
    type Output: Send;

    fn status(&self, code: u16) -> Result<()>;

    /// Apply every header of the mapping in one call.
    fn set(&self, headers: &Headers) -> Result<()>;

    fn cookie(&self, name: &str, value: &Value, options: Option<&CookieOptions>) -> Result<()>;

    fn redirect(&self, redirect: &Redirect) -> Result<Self::Output>;

    fn render(&self, view: &str, locals: Locals) -> Result<Self::Output>;

    /// Send `body`, or an empty response when `None`.
    fn send(&self, body: Option<Value>) -> Result<Self::Output>;
}

/// The continuation ("next") supplied by the calling framework.
///
/// Handlers may call it themselves to delegate; the adapter calls it with
/// the handler's error.
pub trait Next: Clone + Send + Sync {
    /// Whatever the continuation accepts: an error or a forwarded value.
    type Signal;
    type Output: Send;

    fn call(&self, signal: Self::Signal) -> Self::Output;
}

/// A [`Next`] built from a closure.
pub struct Continuation<S, O> {
    f: Arc<dyn Fn(S) -> O + Send + Sync>,
}

impl<S, O> Continuation<S, O> {
    pub fn new(f: impl Fn(S) -> O + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }
}

impl<S, O> Clone for Continuation<S, O> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<S, O> fmt::Debug for Continuation<S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuation").finish_non_exhaustive()
    }
}

impl<S, O: Send> Next for Continuation<S, O> {
    type Signal = S;
    type Output = O;

    fn call(&self, signal: S) -> O {
        (self.f)(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn unit_request_has_no_csrf_tokens() {
        assert!(matches!(().csrf_token(), Err(Error::CsrfUnavailable)));
    }

    #[test]
    fn continuation_clones_share_the_closure() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let next = Continuation::new(move |signal: &'static str| {
            sink.lock().unwrap().push(signal);
            signal.len()
        });

        let other = next.clone();
        assert_eq!(next.call("first"), 5);
        assert_eq!(other.call("second"), 6);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }
}
