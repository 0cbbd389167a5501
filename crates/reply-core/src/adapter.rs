//! The response adapter.
//!
//! [`adapt`] turns a [`Handler`] that returns a [`HandlerResult`] into
//! [`Adapted`], whose [`Adapted::call`] applies the descriptor to the
//! response collaborator in a fixed order:
//!
//! ```text
//! handler(req, res, next, args) --Err(e)--> next(e)            (done)
//!     |
//!     Ok(result)
//!     v
//! status(code)            unless a redirect is requested
//! set(headers)            when headers are present
//! cookie(..)              once per cookie, in order
//! redirect(..)            terminal
//! csrf token -> locals    when requested
//! render(view, locals)    terminal
//! send(body) / send()     terminal
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborator::{Next, Request, Response};
use crate::error::Result;
use crate::handler::Handler;
use crate::result::{Headers, HandlerResult, Locals};

/// How the adapter decides whether a body is present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BodyPresence {
    /// `Some(value)` is present, whatever the value.
    #[default]
    Explicit,
    /// `null`, `false`, `0` and `""` count as absent, and so does an empty
    /// view name.
    Truthy,
}

impl BodyPresence {
    fn keeps(self, value: &Value) -> bool {
        match self {
            BodyPresence::Explicit => true,
            BodyPresence::Truthy => is_truthy(value),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Feature switches for the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Honor the `redirect` field. When off it is ignored entirely.
    pub redirects: bool,
    /// Honor the `csrf` flag.
    pub csrf: bool,
    /// Call the header effect with an empty mapping when no headers were
    /// returned.
    pub always_set_headers: bool,
    pub body_presence: BodyPresence,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            redirects: true,
            csrf: true,
            always_set_headers: false,
            body_presence: BodyPresence::Explicit,
        }
    }
}

/// How an adapted call finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T, F> {
    /// A terminal effect ran; carries its result.
    Responded(T),
    /// The handler failed and its error went to the continuation; carries
    /// the continuation's result.
    Delegated(F),
}

impl<T, F> Completion<T, F> {
    pub fn is_delegated(&self) -> bool {
        matches!(self, Completion::Delegated(_))
    }

    pub fn responded(self) -> Option<T> {
        match self {
            Completion::Responded(out) => Some(out),
            Completion::Delegated(_) => None,
        }
    }

    pub fn delegated(self) -> Option<F> {
        match self {
            Completion::Responded(_) => None,
            Completion::Delegated(out) => Some(out),
        }
    }
}

/// Builder for adapters with a non-default [`AdapterConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Adapter {
    config: AdapterConfig,
}

impl Adapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdapterConfig) -> Self {
        Self { config }
    }

    pub fn redirects(mut self, enabled: bool) -> Self {
        self.config.redirects = enabled;
        self
    }

    pub fn csrf(mut self, enabled: bool) -> Self {
        self.config.csrf = enabled;
        self
    }

    pub fn always_set_headers(mut self, enabled: bool) -> Self {
        self.config.always_set_headers = enabled;
        self
    }

    pub fn body_presence(mut self, presence: BodyPresence) -> Self {
        self.config.body_presence = presence;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn adapt<H>(self, handler: H) -> Adapted<H> {
        Adapted {
            handler,
            config: self.config,
        }
    }
}

/// Adapt `handler` with the default configuration.
pub fn adapt<H>(handler: H) -> Adapted<H> {
    Adapter::new().adapt(handler)
}

/// A handler wrapped by the adapter. Stateless apart from its
/// configuration, so one value can serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct Adapted<H> {
    handler: H,
    config: AdapterConfig,
}

impl<H> Adapted<H> {
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Invoke the handler and apply its descriptor.
    ///
    /// A handler error is passed to `next` unchanged and no effect runs.
    /// An `Err` from this method is a collaborator failure; it is returned
    /// to the caller, never to `next`.
    pub async fn call<Req, Res, N, A>(
        &self,
        request: Req,
        response: Res,
        next: N,
        args: A,
    ) -> Result<Completion<Res::Output, N::Output>>
    where
        Req: Request,
        Res: Response,
        N: Next,
        H: Handler<Req, Res, N, A>,
        H::Error: Into<N::Signal>,
    {
        let outcome = self
            .handler
            .call(request.clone(), response.clone(), next.clone(), args)
            .await;

        match outcome {
            Ok(result) => self
                .apply(&request, &response, result)
                .map(Completion::Responded),
            Err(error) => {
                tracing::trace!("handler failed, delegating to continuation");
                Ok(Completion::Delegated(next.call(error.into())))
            }
        }
    }

    /// Map a descriptor onto the response effects.
    pub fn apply<Req, Res>(
        &self,
        request: &Req,
        response: &Res,
        result: HandlerResult,
    ) -> Result<Res::Output>
    where
        Req: Request,
        Res: Response,
    {
        let status = result.effective_status();
        let HandlerResult {
            body,
            headers,
            cookies,
            render,
            render_locals,
            redirect,
            csrf,
            ..
        } = result;

        let redirect = redirect.filter(|_| self.config.redirects);

        if redirect.is_none() {
            tracing::trace!(status, "applying status effect");
            response.status(status)?;
        }

        match headers {
            Some(headers) => {
                tracing::trace!(count = headers.len(), "applying header effect");
                response.set(&headers)?;
            }
            None if self.config.always_set_headers => response.set(&Headers::new())?,
            None => {}
        }

        for cookie in &cookies {
            tracing::trace!(name = %cookie.name, "applying cookie effect");
            response.cookie(&cookie.name, &cookie.value, cookie.options.as_ref())?;
        }

        if let Some(redirect) = redirect {
            tracing::trace!(location = %redirect.location, "applying redirect effect");
            return response.redirect(&redirect);
        }

        let mut locals = render_locals.unwrap_or_else(Locals::new);
        if csrf && self.config.csrf {
            let token = request.csrf_token()?;
            locals.insert("csrf".to_owned(), Value::String(token));
        }

        let view = render.filter(|view| {
            self.config.body_presence == BodyPresence::Explicit || !view.is_empty()
        });
        if let Some(view) = view {
            tracing::trace!(%view, "applying render effect");
            return response.render(&view, locals);
        }

        let presence = self.config.body_presence;
        let body = body.filter(|body| presence.keeps(body));
        tracing::trace!(has_body = body.is_some(), "applying send effect");
        response.send(body)
    }
}
