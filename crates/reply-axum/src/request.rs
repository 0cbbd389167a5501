//! The request collaborator: request parts plus the buffered body.

use std::sync::Arc;

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri, header};
use serde::de::DeserializeOwned;

use crate::csrf::{CSRF_FIELD, CSRF_HEADER, CsrfError, CsrfTokens};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// An incoming request, cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    parts: Parts,
    body: Bytes,
    csrf: Option<CsrfTokens>,
}

impl HttpRequest {
    pub fn new(parts: Parts, body: Bytes, csrf: Option<CsrfTokens>) -> Self {
        Self {
            inner: Arc::new(Inner { parts, body, csrf }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.parts.uri
    }

    pub fn path(&self) -> &str {
        self.inner.parts.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.inner.parts.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.parts.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// A cookie sent by the client, percent-decoded.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.inner
            .parts
            .headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| {
                urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string())
            })
    }

    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Parse the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.inner.body)
    }

    /// A field of an `application/x-www-form-urlencoded` body,
    /// percent-decoded. `None` for any other content type.
    pub fn form_field(&self, name: &str) -> Option<String> {
        let content_type = self.header(header::CONTENT_TYPE.as_str())?;
        if !content_type.starts_with(FORM_CONTENT_TYPE) {
            return None;
        }
        std::str::from_utf8(&self.inner.body)
            .ok()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| {
                urlencoding::decode(&value.replace('+', " "))
                    .ok()
                    .map(|v| v.into_owned())
            })
    }

    /// Check the token in the [`CSRF_HEADER`] header, or failing that the
    /// [`CSRF_FIELD`] field of a form body.
    pub fn verify_csrf(&self) -> Result<(), CsrfError> {
        let tokens = self.inner.csrf.as_ref().ok_or(CsrfError::Disabled)?;
        match self.header(CSRF_HEADER) {
            Some(token) => tokens.verify(token),
            None => {
                let token = self.form_field(CSRF_FIELD).ok_or(CsrfError::Missing)?;
                tokens.verify(&token)
            }
        }
    }
}

impl reply_core::Request for HttpRequest {
    fn csrf_token(&self) -> reply_core::Result<String> {
        self.inner
            .csrf
            .as_ref()
            .map(CsrfTokens::issue)
            .ok_or(reply_core::Error::CsrfUnavailable)
    }
}
