//! # Circuit Core
//!
//! Circuit breaker access-control engine. Decides, per message type, whether
//! messages may enter the processing pipeline, and manages who may disable
//! ("trip") or re-enable ("reset") a message type.
//!
//! ## Components
//!
//! | Component | Module | Role |
//! |-----------|--------|------|
//! | Permission + Circuit State Stores | `circuit_store` | Durable sled-backed state |
//! | Authorization Evaluator | [`evaluator`] | Pure predicates over a [`Permission`] |
//! | Command Handlers | [`CircuitBreaker`] | Authorize / Trip / Reset, all-or-nothing |
//! | Admission Filter | [`AdmissionFilter`] | Per-message gate on the hot path |
//!
//! ## Architecture
//!
//! ```text
//!   AuthorizeRequest / TripRequest / ResetRequest        message type url
//!                        │                                      │
//!                        ▼                                      ▼
//!              ┌───────────────────┐                  ┌──────────────────┐
//!              │  CircuitBreaker   │                  │ AdmissionFilter  │
//!              │  validate ─▶ tx   │                  │  keyed lookup    │
//!              └────────┬──────────┘                  └────────┬─────────┘
//!                       │ evaluator::can_*                     │ read only
//!                       ▼                                      ▼
//!              ┌────────────────────────────────────────────────────────┐
//!              │         Storage: permissions tree │ disabled tree      │
//!              └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use circuit_core::{AuthorizeRequest, CircuitBreaker, CircuitConfig, CircuitError, ResetRequest, TripRequest};
//! use circuit_store::{PermissionLevel, Storage};
//!
//! let mut config = CircuitConfig::default();
//! config.authority.bootstrap_authorities = vec!["gov".to_string()];
//! let breaker = CircuitBreaker::with_storage(config, Storage::temporary()?)?;
//!
//! breaker.authorize(&AuthorizeRequest::new("gov", "ops", PermissionLevel::AllMsgs, vec![]))?;
//! breaker.trip(&TripRequest::new("ops", vec!["bank.Send"]))?;
//!
//! let filter = breaker.admission_filter();
//! assert!(matches!(
//!     filter.check("bank.Send"),
//!     Err(CircuitError::CircuitBreakerTripped { .. })
//! ));
//!
//! breaker.reset(&ResetRequest::new("ops", vec!["bank.Send"]))?;
//! assert!(filter.check("bank.Send").is_ok());
//! # Ok::<(), CircuitError>(())
//! ```
//!
//! ## Notes
//!
//! - Request shape is validated before authorization
//! - Every command commits in one store transaction or not at all
//! - Admission rejections are ordinary results and are never retried here

mod admission;
mod audit;
mod breaker;
mod config;
mod error;
pub mod evaluator;
mod genesis;
mod request;
mod type_url;

pub use admission::{AdmissionFilter, DisabledLookup};
pub use audit::{AuditEvent, Operation};
pub use breaker::CircuitBreaker;
pub use config::{AuthorityConfig, CircuitConfig, GlobalConfig, StoreConfig};
pub use error::CircuitError;
pub use genesis::{GenesisAccount, GenesisState};
pub use request::{AuthorizeRequest, ResetRequest, TripRequest};
pub use type_url::{normalize_type_urls, split_type_urls, validate_type_url};

// Re-export store types for convenience
pub use circuit_store::{Permission, PermissionGrant, PermissionLevel, Storage};

/// Core result type for circuit breaker operations.
pub type Result<T> = std::result::Result<T, CircuitError>;
