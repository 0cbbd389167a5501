//! The error-handler seam, invoked with whatever reached the continuation.

use std::fmt;

use async_trait::async_trait;
use serde_json::json;

use reply_core::{Response, Result};

use crate::request::HttpRequest;
use crate::response::HttpResponse;

/// Handles a signal forwarded to the continuation by writing a response.
///
/// Runs only when the adapted call left the response unfinished. Plain
/// closures `Fn(E, &HttpRequest, &HttpResponse) -> reply_core::Result<()>`
/// implement this trait.
#[async_trait]
pub trait ErrorHandler<E: Send + 'static>: Send + Sync {
    async fn handle(&self, error: E, request: &HttpRequest, response: &HttpResponse) -> Result<()>;
}

#[async_trait]
impl<E, F> ErrorHandler<E> for F
where
    E: Send + 'static,
    F: Fn(E, &HttpRequest, &HttpResponse) -> Result<()> + Send + Sync,
{
    async fn handle(&self, error: E, request: &HttpRequest, response: &HttpResponse) -> Result<()> {
        (self)(error, request, response)
    }
}

/// Default error handler: logs the error and answers 500 with
/// `{"error": "<message>"}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrors;

#[async_trait]
impl<E> ErrorHandler<E> for JsonErrors
where
    E: fmt::Display + Send + 'static,
{
    async fn handle(&self, error: E, request: &HttpRequest, response: &HttpResponse) -> Result<()> {
        tracing::error!(
            method = %request.method(),
            path = request.path(),
            error = %error,
            "request failed"
        );
        response.status(500)?;
        response.send(Some(json!({ "error": error.to_string() })))
    }
}
