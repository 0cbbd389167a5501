//! Write request handlers as async functions that return a descriptor.
//!
//! A handler returns a [`HandlerResult`] describing the status, headers,
//! cookies and body (or view, or redirect) it wants. [`adapt`] wraps it so
//! the descriptor is applied to a [`Response`] collaborator, and any
//! handler error is forwarded to the [`Next`] continuation.
//!
//! # Example
//!
//! ```ignore
//! use reply_core::{adapt, HandlerResult};
//! use serde_json::json;
//!
//! async fn create(_req: MyRequest, _res: MyResponse, _next: MyNext, (id,): (String,))
//!     -> Result<HandlerResult, MyError>
//! {
//!     Ok(HandlerResult::new().status(201).body(json!({ "id": id })))
//! }
//!
//! let create = adapt(create);
//!
//! create.call(req, res, next, ("1".to_string(),)).await?;
//! ```

pub mod adapter;
pub mod collaborator;
pub mod error;
pub mod handler;
pub mod result;

pub use adapter::{Adapted, Adapter, AdapterConfig, BodyPresence, Completion, adapt};
pub use collaborator::{Continuation, Next, Request, Response};
pub use error::{BoxError, EffectKind, Error, Result};
pub use handler::{Blocking, Handler};
pub use result::{
    Cookie, CookieOptions, DEFAULT_STATUS, HandlerResult, Headers, Locals, Redirect, SameSite,
};
