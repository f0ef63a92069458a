//! # Admission Filter
//!
//! The gate the message pipeline consults before a message is queued or
//! executed. One keyed lookup in the `disabled` tree per message; no writes.
//!
//! A rejection is [`CircuitError::CircuitBreakerTripped`]. It is an ordinary
//! negative answer, not an internal failure, and the message must be dropped
//! without retry.

use crate::{error::CircuitError, Result};
use circuit_store::{Storage, StoreError};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read side of the circuit state consulted by the admission filter.
pub trait DisabledLookup: fmt::Debug + Send + Sync {
    /// Returns true if `type_url` is disabled.
    fn is_disabled(&self, type_url: &str) -> std::result::Result<bool, StoreError>;
}

impl DisabledLookup for Storage {
    fn is_disabled(&self, type_url: &str) -> std::result::Result<bool, StoreError> {
        Storage::is_disabled(self, type_url)
    }
}

/// Read-only admission check over committed circuit state.
///
/// Cloning is cheap and clones share the underlying lookup, so one filter
/// per pipeline worker is fine.
///
/// # Example
///
/// ```rust
/// use circuit_core::AdmissionFilter;
/// use circuit_store::Storage;
///
/// let storage = Storage::temporary().unwrap();
/// let filter = AdmissionFilter::new(storage.clone(), true);
///
/// assert!(filter.check("bank.Send").is_ok());
///
/// storage.disable("bank.Send").unwrap();
/// assert!(filter.check("bank.Send").unwrap_err().is_tripped());
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    lookup: Arc<dyn DisabledLookup>,
    fail_closed: bool,
}

impl AdmissionFilter {
    /// Creates a filter over `storage`.
    ///
    /// With `fail_closed` set, a storage read failure rejects the message
    /// with `CircuitError::Storage`; otherwise the message is admitted and a
    /// warning is logged.
    pub fn new(storage: Storage, fail_closed: bool) -> Self {
        Self::with_lookup(Arc::new(storage), fail_closed)
    }

    /// Creates a filter over any [`DisabledLookup`].
    pub fn with_lookup(lookup: Arc<dyn DisabledLookup>, fail_closed: bool) -> Self {
        Self {
            lookup,
            fail_closed,
        }
    }

    /// Admits or rejects one message by its type identifier.
    ///
    /// # Errors
    ///
    /// - `CircuitError::CircuitBreakerTripped` if the type is disabled.
    /// - `CircuitError::Storage` if the lookup fails in fail-closed mode.
    pub fn check(&self, type_url: &str) -> Result<()> {
        match self.lookup.is_disabled(type_url) {
            Ok(false) => Ok(()),
            Ok(true) => {
                debug!("Admission denied for disabled type: {}", type_url);
                Err(CircuitError::CircuitBreakerTripped {
                    type_url: type_url.to_string(),
                })
            }
            Err(e) if self.fail_closed => {
                warn!("Admission lookup failed for '{}': {}", type_url, e);
                Err(CircuitError::Storage(e))
            }
            Err(e) => {
                warn!(
                    "Admission lookup failed for '{}', admitting (fail-open): {}",
                    type_url, e
                );
                Ok(())
            }
        }
    }

    /// Checks every message of a multi-message transaction in order.
    ///
    /// Stops at the first rejection, so the whole transaction is refused if
    /// any of its messages is disabled.
    pub fn check_all<'a, I>(&self, type_urls: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        type_urls
            .into_iter()
            .try_for_each(|type_url| self.check(type_url))
    }

    /// Convenience form of [`check`](Self::check).
    pub fn is_admitted(&self, type_url: &str) -> bool {
        self.check(type_url).is_ok()
    }
}
