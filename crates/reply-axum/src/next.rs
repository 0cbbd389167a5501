//! The continuation handed to adapted handlers on an axum route.

use std::sync::{Arc, Mutex, PoisonError};

use reply_core::Next;

/// Records the signal passed to the continuation so the route can hand it
/// to the error handler once the adapted call returns.
///
/// Only the first signal is kept.
#[derive(Debug)]
pub struct HttpNext<E> {
    signal: Arc<Mutex<Option<E>>>,
}

impl<E> HttpNext<E> {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_called(&self) -> bool {
        self.signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Take the recorded signal, leaving the continuation uncalled.
    pub fn take(&self) -> Option<E> {
        self.signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<E> Default for HttpNext<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for HttpNext<E> {
    fn clone(&self) -> Self {
        Self {
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<E: Send> Next for HttpNext<E> {
    type Signal = E;
    type Output = ();

    fn call(&self, signal: E) {
        let mut slot = self.signal.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            tracing::warn!("continuation called more than once, keeping the first signal");
            return;
        }
        *slot = Some(signal);
    }
}
