//! Error types for the circuit breaker engine.

use circuit_store::StoreError;
use thiserror::Error;

/// Core error type for circuit breaker operations.
#[derive(Debug, Error)]
pub enum CircuitError {
    /// Malformed request: empty identifier list, bad identifier, or an
    /// inconsistent permission shape.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The actor lacks the permission the operation requires.
    #[error("Unauthorized: account '{actor}' {reason}")]
    Unauthorized {
        /// Account that issued the command.
        actor: String,
        /// What the account was not allowed to do.
        reason: String,
    },

    /// Backend failure. The enclosing transaction was aborted.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Admission rejected because the message type is disabled.
    #[error("Circuit breaker tripped for '{type_url}'")]
    CircuitBreakerTripped {
        /// The disabled type identifier.
        type_url: String,
    },

    /// Configuration or genesis loading error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CircuitError {
    pub(crate) fn unauthorized(actor: &str, reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            actor: actor.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for an admission rejection.
    pub fn is_tripped(&self) -> bool {
        matches!(self, Self::CircuitBreakerTripped { .. })
    }
}
