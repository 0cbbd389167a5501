//! The handler seam: business logic that returns a [`HandlerResult`].

use std::future::{self, Future, Ready};

use crate::result::HandlerResult;

/// A request handler with the `(request, response, next, args)` calling
/// convention.
///
/// Implemented for async closures returning
/// `Result<HandlerResult, E>`. Wrap a synchronous closure in [`Blocking`].
pub trait Handler<Req, Res, N, A>: Send + Sync {
    type Error;
    type Future: Future<Output = Result<HandlerResult, Self::Error>> + Send;

    fn call(&self, request: Req, response: Res, next: N, args: A) -> Self::Future;
}

impl<F, Fut, E, Req, Res, N, A> Handler<Req, Res, N, A> for F
where
    F: Fn(Req, Res, N, A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HandlerResult, E>> + Send,
{
    type Error = E;
    type Future = Fut;

    fn call(&self, request: Req, response: Res, next: N, args: A) -> Fut {
        (self)(request, response, next, args)
    }
}

/// A synchronous handler. An `Err` here is the "thrown before any await"
/// failure and is forwarded exactly like an async one.
#[derive(Debug, Clone, Copy)]
pub struct Blocking<F>(pub F);

impl<F, E, Req, Res, N, A> Handler<Req, Res, N, A> for Blocking<F>
where
    F: Fn(Req, Res, N, A) -> Result<HandlerResult, E> + Send + Sync,
    E: Send,
{
    type Error = E;
    type Future = Ready<Result<HandlerResult, E>>;

    fn call(&self, request: Req, response: Res, next: N, args: A) -> Self::Future {
        future::ready((self.0)(request, response, next, args))
    }
}
