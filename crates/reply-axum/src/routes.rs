//! Mounting adapted handlers on an axum [`Router`].
//!
//! [`Routes`] collects `(method, path, handler)` entries plus the shared
//! pieces every endpoint needs (error handler, view engine, CSRF tokens,
//! body limit) and turns them into a router in [`Routes::into_router`].

use std::fmt;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{self, MethodRouter};
use futures::future::BoxFuture;

use reply_core::{Adapted, BoxError, Handler};

use crate::csrf::CsrfTokens;
use crate::errors::{ErrorHandler, JsonErrors};
use crate::next::HttpNext;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use crate::views::ViewEngine;

/// Largest request body buffered before the handler runs.
pub const DEFAULT_BODY_LIMIT: usize = 1_048_576;

/// A type-erased adapted handler that can be mounted on a route.
pub trait Dispatch<E>: Send + Sync {
    fn dispatch(
        &self,
        request: HttpRequest,
        response: HttpResponse,
        next: HttpNext<E>,
    ) -> BoxFuture<'_, reply_core::Result<()>>;
}

impl<H, E> Dispatch<E> for Adapted<H>
where
    H: Handler<HttpRequest, HttpResponse, HttpNext<E>, ()>,
    H::Error: Into<E>,
    E: Send + 'static,
{
    fn dispatch(
        &self,
        request: HttpRequest,
        response: HttpResponse,
        next: HttpNext<E>,
    ) -> BoxFuture<'_, reply_core::Result<()>> {
        Box::pin(async move { self.call(request, response, next, ()).await.map(drop) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl MethodKind {
    fn router<H, T>(self, handler: H) -> MethodRouter
    where
        H: axum::handler::Handler<T, ()>,
        T: 'static,
    {
        match self {
            MethodKind::Any => routing::any(handler),
            MethodKind::Get => routing::get(handler),
            MethodKind::Post => routing::post(handler),
            MethodKind::Put => routing::put(handler),
            MethodKind::Patch => routing::patch(handler),
            MethodKind::Delete => routing::delete(handler),
        }
    }
}

struct Route<E> {
    method: MethodKind,
    path: String,
    dispatch: Arc<dyn Dispatch<E>>,
}

struct Shared<E> {
    errors: Arc<dyn ErrorHandler<E>>,
    views: Option<Arc<dyn ViewEngine>>,
    csrf: Option<CsrfTokens>,
    body_limit: usize,
}

/// A set of adapted handlers ready to become an axum [`Router`].
///
/// `E` is the continuation's signal type; every handler error must
/// convert into it.
///
/// # Example
///
/// ```ignore
/// let app = Routes::<MyError>::new()
///     .all("/", adapt(home))
///     .post("/users", adapt(create_user))
///     .error_handler(|err: MyError, _req: &HttpRequest, res: &HttpResponse| {
///         res.status(err.status())?;
///         res.send(None)
///     })
///     .into_router();
/// ```
pub struct Routes<E: Send + 'static = BoxError> {
    routes: Vec<Route<E>>,
    errors: Arc<dyn ErrorHandler<E>>,
    views: Option<Arc<dyn ViewEngine>>,
    csrf: Option<CsrfTokens>,
    body_limit: usize,
}

impl<E> Routes<E>
where
    E: fmt::Display + Send + 'static,
{
    /// An empty set of routes using [`JsonErrors`].
    pub fn new() -> Self {
        Self::with_error_handler(JsonErrors)
    }
}

impl<E> Default for Routes<E>
where
    E: fmt::Display + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Send + 'static> Routes<E> {
    /// An empty set of routes with a custom error handler.
    pub fn with_error_handler(errors: impl ErrorHandler<E> + 'static) -> Self {
        Self {
            routes: Vec::new(),
            errors: Arc::new(errors),
            views: None,
            csrf: None,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Replace the error handler.
    pub fn error_handler(mut self, errors: impl ErrorHandler<E> + 'static) -> Self {
        self.errors = Arc::new(errors);
        self
    }

    pub fn views(mut self, views: impl ViewEngine + 'static) -> Self {
        self.views = Some(Arc::new(views));
        self
    }

    /// Give every request the capability to issue CSRF tokens.
    pub fn csrf(mut self, tokens: CsrfTokens) -> Self {
        self.csrf = Some(tokens);
        self
    }

    pub fn body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    /// Mount for every method.
    pub fn all(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Any, path, handler)
    }

    pub fn get(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Get, path, handler)
    }

    pub fn post(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Post, path, handler)
    }

    pub fn put(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Put, path, handler)
    }

    pub fn patch(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Patch, path, handler)
    }

    pub fn delete(self, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.push(MethodKind::Delete, path, handler)
    }

    fn push(mut self, method: MethodKind, path: &str, handler: impl Dispatch<E> + 'static) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            dispatch: Arc::new(handler),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build the router.
    ///
    /// Routes on the same path merge by method. Mounting `all` and a
    /// specific method on one path overlaps and panics, as in axum.
    pub fn into_router(self) -> Router {
        let shared = Arc::new(Shared {
            errors: self.errors,
            views: self.views,
            csrf: self.csrf,
            body_limit: self.body_limit,
        });

        self.routes
            .into_iter()
            .fold(Router::new(), |router, route| {
                let shared = Arc::clone(&shared);
                let dispatch = route.dispatch;
                let endpoint = move |request: Request| {
                    let shared = Arc::clone(&shared);
                    let dispatch = Arc::clone(&dispatch);
                    async move { serve(dispatch, shared, request).await }
                };
                router.route(&route.path, route.method.router(endpoint))
            })
    }
}

impl<E: Send + 'static> fmt::Debug for Routes<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Routes")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| format!("{:?} {}", r.method, r.path))
                    .collect::<Vec<_>>(),
            )
            .field("views", &self.views.is_some())
            .field("csrf", &self.csrf.is_some())
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

fn internal_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

async fn serve<E: Send + 'static>(
    dispatch: Arc<dyn Dispatch<E>>,
    shared: Arc<Shared<E>>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, shared.body_limit).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = parts.uri.path(), error = %err, "rejecting request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response();
        }
    };

    let request = HttpRequest::new(parts, body, shared.csrf.clone());
    let response = HttpResponse::new(shared.views.clone());
    let next = HttpNext::new();

    tracing::debug!(method = %request.method(), path = request.path(), "dispatching");

    if let Err(err) = dispatch
        .dispatch(request.clone(), response.clone(), next.clone())
        .await
    {
        tracing::error!(
            method = %request.method(),
            path = request.path(),
            error = %err,
            "response effect failed"
        );
        if !response.is_finished() {
            return internal_error();
        }
        // The handler already sent a response; keep it.
        return response.into_response();
    }

    if let Some(signal) = next.take() {
        if response.is_finished() {
            tracing::warn!(
                path = request.path(),
                "continuation called but the response was already sent"
            );
        } else if let Err(err) = shared.errors.handle(signal, &request, &response).await {
            tracing::error!(
                method = %request.method(),
                path = request.path(),
                error = %err,
                "error handler failed"
            );
            return internal_error();
        }
    }

    response.into_response()
}
