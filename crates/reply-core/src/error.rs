//! Error type for collaborator failures.
//!
//! Handler failures never surface here: they are forwarded to the
//! continuation as-is. This type only covers what the collaborators
//! themselves report while effects are applied.

use std::fmt;

/// Boxed error used as the source of collaborator failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The effect (or request capability) that was being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Status,
    Set,
    Cookie,
    Redirect,
    Render,
    Send,
    CsrfToken,
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EffectKind::Status => "status",
            EffectKind::Set => "set",
            EffectKind::Cookie => "cookie",
            EffectKind::Redirect => "redirect",
            EffectKind::Render => "render",
            EffectKind::Send => "send",
            EffectKind::CsrfToken => "csrf-token",
        };
        f.write_str(s)
    }
}

/// Errors reported by the request or response collaborator.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{effect} effect failed: {source}")]
    Effect {
        effect: EffectKind,
        #[source]
        source: BoxError,
    },

    #[error("request does not provide CSRF tokens")]
    CsrfUnavailable,

    #[error("invalid redirect arguments: {0}")]
    InvalidRedirect(String),
}

impl Error {
    /// Wrap a collaborator failure for the given effect.
    pub fn effect(effect: EffectKind, source: impl Into<BoxError>) -> Self {
        Self::Effect {
            effect,
            source: source.into(),
        }
    }

    /// The effect that failed, if this error came from one.
    pub fn effect_kind(&self) -> Option<EffectKind> {
        match self {
            Error::Effect { effect, .. } => Some(*effect),
            Error::CsrfUnavailable => Some(EffectKind::CsrfToken),
            Error::InvalidRedirect(_) => None,
        }
    }
}

/// Result type alias using the collaborator [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_error_display_names_the_effect() {
        let err = Error::effect(EffectKind::Render, "template missing");
        assert_eq!(err.to_string(), "render effect failed: template missing");
        assert_eq!(err.effect_kind(), Some(EffectKind::Render));
    }

    #[test]
    fn csrf_unavailable_maps_to_token_capability() {
        assert_eq!(
            Error::CsrfUnavailable.effect_kind(),
            Some(EffectKind::CsrfToken)
        );
        assert_eq!(Error::InvalidRedirect("[]".into()).effect_kind(), None);
    }
}
