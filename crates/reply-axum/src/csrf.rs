//! CSRF tokens backing the request collaborator's token capability.
//!
//! Tokens are HMAC-SHA256 over a random nonce.
//! Format: `<nonce_hex>.<hmac_hex>`

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Request header checked by [`crate::HttpRequest::verify_csrf`].
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Form field checked when the header is absent.
pub const CSRF_FIELD: &str = "_csrf";

const NONCE_LEN: usize = 16;

/// Errors that can occur while verifying a CSRF token.
#[derive(Debug, thiserror::Error)]
pub enum CsrfError {
    #[error("CSRF tokens are not configured")]
    Disabled,

    #[error("missing CSRF token")]
    Missing,

    #[error("invalid CSRF token format: {0}")]
    InvalidFormat(String),

    #[error("CSRF token verification failed")]
    Mismatch,
}

/// Issues and verifies CSRF tokens with a shared secret.
#[derive(Clone)]
pub struct CsrfTokens {
    secret: Arc<[u8]>,
}

impl CsrfTokens {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        let secret: Vec<u8> = secret.into();
        Self {
            secret: secret.into(),
        }
    }

    /// Build from a hex-encoded secret (as written by `reply init`).
    pub fn from_hex(secret_hex: &str) -> Result<Self, CsrfError> {
        let secret = hex::decode(secret_hex.trim())
            .map_err(|e| CsrfError::InvalidFormat(format!("secret is not valid hex: {e}")))?;
        Ok(Self::new(secret))
    }

    /// Issue a fresh token.
    pub fn issue(&self) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);
        let mac = compute_hmac(&self.secret, &nonce);
        format!("{}.{}", hex::encode(nonce), hex::encode(mac))
    }

    /// Verify a token issued with the same secret.
    pub fn verify(&self, token: &str) -> Result<(), CsrfError> {
        let (nonce_hex, mac_hex) = token
            .split_once('.')
            .ok_or_else(|| CsrfError::InvalidFormat("expected <nonce>.<mac>".to_string()))?;

        let nonce = hex::decode(nonce_hex)
            .map_err(|e| CsrfError::InvalidFormat(format!("invalid hex in nonce: {e}")))?;
        if nonce.len() != NONCE_LEN {
            return Err(CsrfError::InvalidFormat(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            )));
        }
        let provided = hex::decode(mac_hex)
            .map_err(|e| CsrfError::InvalidFormat(format!("invalid hex in mac: {e}")))?;

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(&nonce);
        mac.verify_slice(&provided).map_err(|_| CsrfError::Mismatch)
    }
}

impl fmt::Debug for CsrfTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsrfTokens")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}
