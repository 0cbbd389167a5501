//! The response collaborator.
//!
//! [`HttpResponse`] is a shared handle over the response being built.
//! Effects behave like a classic Node-style response object: headers and
//! cookies accumulate, then exactly one terminal effect (redirect, render
//! or send) writes the body and finishes the response. Any effect after
//! that fails with [`ResponseError::HeadersSent`].

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::Value;

use reply_core::{CookieOptions, EffectKind, Error, Headers, Locals, Redirect, Result};

use crate::views::ViewEngine;

const DEFAULT_REDIRECT_STATUS: u16 = 302;
const HTML: &str = "text/html; charset=utf-8";
const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Failures raised by the response itself.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("cannot modify a response after it was sent")]
    HeadersSent,

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    #[error("no view engine configured")]
    NoViewEngine,

    #[error("failed to serialize body: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug)]
struct State {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            finished: false,
        }
    }
}

/// The response under construction, shared between the adapter, the
/// handler and the error handler.
#[derive(Clone, Default)]
pub struct HttpResponse {
    state: Arc<Mutex<State>>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl HttpResponse {
    pub fn new(views: Option<Arc<dyn ViewEngine>>) -> Self {
        Self {
            state: Arc::default(),
            views,
        }
    }

    /// Whether a terminal effect already ran.
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }

    pub fn status_code(&self) -> StatusCode {
        self.lock().status
    }

    pub fn headers(&self) -> HeaderMap {
        self.lock().headers.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state for a modification, refusing once finished.
    fn open(&self, effect: EffectKind) -> Result<MutexGuard<'_, State>> {
        let state = self.lock();
        if state.finished {
            return Err(Error::effect(effect, ResponseError::HeadersSent));
        }
        Ok(state)
    }

    /// Write the body and finish. Keeps a content type set earlier.
    fn finish(
        &self,
        effect: EffectKind,
        content_type: Option<&'static str>,
        body: Bytes,
    ) -> Result<()> {
        let mut state = self.open(effect)?;
        if let Some(content_type) = content_type {
            state
                .headers
                .entry(header::CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }
        state.body = body;
        state.finished = true;
        Ok(())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("HttpResponse")
            .field("status", &state.status)
            .field("finished", &state.finished)
            .field("views", &self.views.is_some())
            .finish()
    }
}

fn parse_status(effect: EffectKind, code: u16) -> Result<StatusCode> {
    StatusCode::from_u16(code)
        .map_err(|_| Error::effect(effect, ResponseError::InvalidStatus(code)))
}

fn header_value(effect: EffectKind, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::effect(effect, ResponseError::InvalidHeader(value.to_string())))
}

/// Serialize one `Set-Cookie` value.
///
/// String values are used as-is, numbers and booleans in their JSON text
/// form, anything else as `j:` followed by its JSON. `Max-Age` is given in
/// seconds from the millisecond `max_age` option; `Path` defaults to `/`.
/// No `Expires` is derived from `max_age`; pass `expires` explicitly for
/// clients that ignore `Max-Age`.
pub fn serialize_cookie(name: &str, value: &Value, options: Option<&CookieOptions>) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => format!("j:{other}"),
    };

    let mut cookie = format!("{name}={}", urlencoding::encode(&raw));
    let default = CookieOptions::default();
    let options = options.unwrap_or(&default);

    if let Some(max_age) = options.max_age {
        let _ = write!(cookie, "; Max-Age={}", max_age / 1000);
    }
    if let Some(domain) = &options.domain {
        let _ = write!(cookie, "; Domain={domain}");
    }
    let _ = write!(cookie, "; Path={}", options.path.as_deref().unwrap_or("/"));
    if let Some(expires) = &options.expires {
        let _ = write!(cookie, "; Expires={expires}");
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if let Some(same_site) = options.same_site {
        let _ = write!(cookie, "; SameSite={}", same_site.as_str());
    }
    cookie
}

impl reply_core::Response for HttpResponse {
    type Output = ();

    fn status(&self, code: u16) -> Result<()> {
        let status = parse_status(EffectKind::Status, code)?;
        self.open(EffectKind::Status)?.status = status;
        Ok(())
    }

    fn set(&self, headers: &Headers) -> Result<()> {
        // Validate the whole mapping before touching the response.
        let parsed = headers
            .iter()
            .map(|(name, value)| {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                    Error::effect(EffectKind::Set, ResponseError::InvalidHeader(name.clone()))
                })?;
                Ok((name, header_value(EffectKind::Set, value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut state = self.open(EffectKind::Set)?;
        for (name, value) in parsed {
            state.headers.insert(name, value);
        }
        Ok(())
    }

    fn cookie(&self, name: &str, value: &Value, options: Option<&CookieOptions>) -> Result<()> {
        let cookie = header_value(EffectKind::Cookie, &serialize_cookie(name, value, options))?;
        self.open(EffectKind::Cookie)?
            .headers
            .append(header::SET_COOKIE, cookie);
        Ok(())
    }

    fn redirect(&self, redirect: &Redirect) -> Result<()> {
        let status = parse_status(
            EffectKind::Redirect,
            redirect.status.unwrap_or(DEFAULT_REDIRECT_STATUS),
        )?;
        let location = header_value(EffectKind::Redirect, &redirect.location)?;
        let reason = status.canonical_reason().unwrap_or("Redirecting");
        let body = format!("{reason}. Redirecting to {}", redirect.location);
        {
            let mut state = self.open(EffectKind::Redirect)?;
            state.status = status;
            state.headers.insert(header::LOCATION, location);
        }
        self.finish(EffectKind::Redirect, Some(TEXT), Bytes::from(body))
    }

    fn render(&self, view: &str, locals: Locals) -> Result<()> {
        let engine = self
            .views
            .as_ref()
            .ok_or_else(|| Error::effect(EffectKind::Render, ResponseError::NoViewEngine))?;
        let html = engine
            .render(view, &locals)
            .map_err(|e| Error::effect(EffectKind::Render, e))?;
        self.finish(EffectKind::Render, Some(HTML), Bytes::from(html))
    }

    fn send(&self, body: Option<Value>) -> Result<()> {
        match body {
            None => self.finish(EffectKind::Send, None, Bytes::new()),
            Some(Value::String(text)) => {
                self.finish(EffectKind::Send, Some(HTML), Bytes::from(text))
            }
            Some(value) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| Error::effect(EffectKind::Send, ResponseError::from(e)))?;
                self.finish(EffectKind::Send, Some(JSON), Bytes::from(bytes))
            }
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let state = std::mem::take(&mut *self.lock());
        let mut response = axum::response::Response::new(Body::from(state.body));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        response
    }
}
