//! axum transport for adapted handlers.
//!
//! Implements the request, response and continuation collaborators on top
//! of `http` types and mounts [`reply_core::Adapted`] handlers as axum
//! routes.
//!
//! # Architecture
//!
//! ```text
//! axum Router
//!     |
//!     v
//! Routes endpoint --buffer body--> HttpRequest
//!     |                            HttpResponse (shared state)
//!     |                            HttpNext (records the signal)
//!     v
//! Adapted::call(req, res, next, ())
//!     |
//!     +-- Err(collaborator) ---------------------> 500
//!     +-- next called, response not finished ---> ErrorHandler
//!     v
//! HttpResponse -> axum::response::Response
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reply_axum::{HttpNext, HttpRequest, HttpResponse, Routes};
//! use reply_core::{adapt, HandlerResult};
//!
//! async fn hello(_req: HttpRequest, _res: HttpResponse, _next: HttpNext<BoxError>, _: ())
//!     -> Result<HandlerResult, BoxError>
//! {
//!     Ok(HandlerResult::new().body("hello"))
//! }
//!
//! let app = Routes::<BoxError>::new().get("/", adapt(hello)).into_router();
//! ```

pub mod csrf;
pub mod errors;
pub mod next;
pub mod request;
pub mod response;
pub mod routes;
pub mod views;

pub use csrf::{CSRF_FIELD, CSRF_HEADER, CsrfError, CsrfTokens};
pub use errors::{ErrorHandler, JsonErrors};
pub use next::HttpNext;
pub use request::HttpRequest;
pub use response::{HttpResponse, ResponseError};
pub use routes::{DEFAULT_BODY_LIMIT, Dispatch, Routes};
pub use views::ViewEngine;
