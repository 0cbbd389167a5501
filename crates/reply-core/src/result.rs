//! The descriptor a handler returns instead of touching the response.
//!
//! Field names serialize in the camelCase form handlers have always used
//! (`statusCode`, `renderLocals`, ...), so a descriptor can be built from
//! JSON as easily as from the builder methods.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Header name to header value, applied in one bulk call.
pub type Headers = BTreeMap<String, String>;

/// Data handed to the view renderer.
pub type Locals = serde_json::Map<String, Value>;

/// Status used when a handler does not pick one.
pub const DEFAULT_STATUS: u16 = 200;

/// Everything a handler wants done to the response.
///
/// All fields are optional. See [`crate::Adapted::call`] for the order in
/// which they are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerResult {
    /// HTTP status; ignored when a redirect is requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Payload to send. `Some(Value::Null)` is a present body.
    #[serde(
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_value"
    )]
    pub body: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cookies: Vec<Cookie>,

    /// View template identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub render_locals: Option<Locals>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,

    /// Merge a CSRF token into the render locals under `csrf`.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub csrf: bool,
}

/// Keep an explicit `null` as a present value instead of collapsing it
/// into `None` the way `Option<Value>` would.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl HandlerResult {
    /// An empty descriptor: status 200 and an empty send.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, code: u16) -> Self {
        self.status_code = Some(code);
        self
    }

    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Add a single header, keeping any set before.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Append a cookie; cookies are applied in the order they were added.
    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    pub fn render(mut self, view: impl Into<String>) -> Self {
        self.render = Some(view.into());
        self
    }

    pub fn locals(mut self, locals: Locals) -> Self {
        self.render_locals = Some(locals);
        self
    }

    /// Insert one render local.
    pub fn local(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.render_locals
            .get_or_insert_with(Locals::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Ask for a CSRF token to be merged into the render locals.
    pub fn csrf(mut self) -> Self {
        self.csrf = true;
        self
    }

    /// The status that will be set: the chosen one or [`DEFAULT_STATUS`].
    pub fn effective_status(&self) -> u16 {
        self.status_code.unwrap_or(DEFAULT_STATUS)
    }
}

/// One cookie-set effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CookieOptions>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            options: None,
        }
    }

    pub fn options(mut self, options: CookieOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Cookie attributes. Interpretation is up to the response collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CookieOptions {
    /// Lifetime in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u64>,
    /// Preformatted HTTP date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub same_site: Option<SameSite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// The redirect argument sequence: `[url]` or `[status, url]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct Redirect {
    pub status: Option<u16>,
    pub location: String,
}

impl Redirect {
    /// Redirect with the collaborator's default status.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            status: None,
            location: location.into(),
        }
    }

    pub fn with_status(status: u16, location: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            location: location.into(),
        }
    }

    /// The positional arguments, as they would be spread into the effect.
    pub fn args(&self) -> Vec<Value> {
        self.clone().into()
    }
}

impl TryFrom<Vec<Value>> for Redirect {
    type Error = Error;

    fn try_from(args: Vec<Value>) -> Result<Self, Self::Error> {
        match args.as_slice() {
            [Value::String(location)] => Ok(Self::to(location.clone())),
            [Value::Number(status), Value::String(location)] => {
                let status = status
                    .as_u64()
                    .and_then(|s| u16::try_from(s).ok())
                    .ok_or_else(|| Error::InvalidRedirect(format!("bad status {status}")))?;
                Ok(Self::with_status(status, location.clone()))
            }
            other => Err(Error::InvalidRedirect(Value::Array(other.to_vec()).to_string())),
        }
    }
}

impl From<Redirect> for Vec<Value> {
    fn from(redirect: Redirect) -> Self {
        match redirect.status {
            Some(status) => vec![Value::from(status), Value::String(redirect.location)],
            None => vec![Value::String(redirect.location)],
        }
    }
}
