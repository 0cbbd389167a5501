//! Recording test doubles for the adapter's collaborators.
//!
//! Construct fresh doubles in each test. Clones share their log, so the
//! copy handed to the adapter and the copy kept by the test see the same
//! calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use reply_core::{
    CookieOptions, EffectKind, Error, Headers, Locals, Next, Redirect, Request, Response, Result,
};

/// One call made on a [`RecordingResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Status(u16),
    Set(Headers),
    Cookie {
        name: String,
        value: Value,
        options: Option<CookieOptions>,
    },
    Redirect(Redirect),
    Render {
        view: String,
        locals: Locals,
    },
    Send(Option<Value>),
}

impl Effect {
    pub fn kind(&self) -> EffectKind {
        match self {
            Effect::Status(_) => EffectKind::Status,
            Effect::Set(_) => EffectKind::Set,
            Effect::Cookie { .. } => EffectKind::Cookie,
            Effect::Redirect(_) => EffectKind::Redirect,
            Effect::Render { .. } => EffectKind::Render,
            Effect::Send(_) => EffectKind::Send,
        }
    }
}

/// A response that records every effect in call order.
///
/// Terminal effects return the recorded [`Effect`], so tests can check the
/// value the adapter hands back.
#[derive(Debug, Clone, Default)]
pub struct RecordingResponse {
    effects: Arc<Mutex<Vec<Effect>>>,
    fail_on: Option<EffectKind>,
}

impl RecordingResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// A response whose `kind` effect fails (after being recorded).
    pub fn failing_on(kind: EffectKind) -> Self {
        Self {
            fail_on: Some(kind),
            ..Self::default()
        }
    }

    /// Every effect so far, in call order.
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().unwrap().clone()
    }

    /// The effect kinds so far, in call order.
    pub fn kinds(&self) -> Vec<EffectKind> {
        self.effects().iter().map(Effect::kind).collect()
    }

    pub fn count(&self, kind: EffectKind) -> usize {
        self.effects().iter().filter(|e| e.kind() == kind).count()
    }

    pub fn is_untouched(&self) -> bool {
        self.effects.lock().unwrap().is_empty()
    }

    fn record(&self, effect: Effect) -> Result<Effect> {
        let kind = effect.kind();
        self.effects.lock().unwrap().push(effect.clone());
        if self.fail_on == Some(kind) {
            return Err(Error::effect(kind, format!("{kind} rejected by test double")));
        }
        Ok(effect)
    }
}

impl Response for RecordingResponse {
    type Output = Effect;

    fn status(&self, code: u16) -> Result<()> {
        self.record(Effect::Status(code)).map(drop)
    }

    fn set(&self, headers: &Headers) -> Result<()> {
        self.record(Effect::Set(headers.clone())).map(drop)
    }

    fn cookie(&self, name: &str, value: &Value, options: Option<&CookieOptions>) -> Result<()> {
        self.record(Effect::Cookie {
            name: name.to_owned(),
            value: value.clone(),
            options: options.cloned(),
        })
        .map(drop)
    }

    fn redirect(&self, redirect: &Redirect) -> Result<Effect> {
        self.record(Effect::Redirect(redirect.clone()))
    }

    fn render(&self, view: &str, locals: Locals) -> Result<Effect> {
        self.record(Effect::Render {
            view: view.to_owned(),
            locals,
        })
    }

    fn send(&self, body: Option<Value>) -> Result<Effect> {
        self.record(Effect::Send(body))
    }
}

/// A continuation that records each signal it receives.
#[derive(Debug)]
pub struct RecordingNext<S> {
    calls: Arc<Mutex<Vec<S>>>,
}

impl<S> RecordingNext<S> {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl<S: Clone> RecordingNext<S> {
    pub fn calls(&self) -> Vec<S> {
        self.calls.lock().unwrap().clone()
    }
}

impl<S> Default for RecordingNext<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for RecordingNext<S> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<S: Send> Next for RecordingNext<S> {
    type Signal = S;
    type Output = ();

    fn call(&self, signal: S) {
        self.calls.lock().unwrap().push(signal);
    }
}

/// A request that optionally hands out a fixed CSRF token.
#[derive(Debug, Clone, Default)]
pub struct StubRequest {
    csrf_token: Option<String>,
    token_fetches: Arc<AtomicUsize>,
}

impl StubRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csrf_token(token: impl Into<String>) -> Self {
        Self {
            csrf_token: Some(token.into()),
            ..Self::default()
        }
    }

    /// How many times a token was asked for.
    pub fn token_fetches(&self) -> usize {
        self.token_fetches.load(Ordering::SeqCst)
    }
}

impl Request for StubRequest {
    fn csrf_token(&self) -> Result<String> {
        self.token_fetches.fetch_add(1, Ordering::SeqCst);
        self.csrf_token.clone().ok_or(Error::CsrfUnavailable)
    }
}
