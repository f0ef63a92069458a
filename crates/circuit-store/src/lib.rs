//! # Circuit Store - Durable Circuit Breaker State
//!
//! Persistence for the circuit breaker: which account holds which
//! [`Permission`], and which message type identifiers are disabled.
//!
//! ## Components
//!
//! | Component | Purpose |
//! |-----------|---------|
//! | [`Permission`] | Closed set of access levels, `SOME_MSGS` carrying its allow-list |
//! | [`PermissionGrant`] | Flat `{level, limit_type_urls}` request/stored shape |
//! | [`Storage`] | Sled database with a `permissions` tree and a `disabled` tree |
//! | [`StoreTx`] | Transactional view over both trees |
//!
//! ## Defaults
//!
//! Both mappings are default-open: an account with no entry holds `NONE`,
//! and a type identifier with no entry is enabled.
//!
//! ## Usage
//!
//! ```rust
//! use circuit_store::{Permission, Storage};
//!
//! let storage = Storage::temporary().unwrap();
//!
//! storage
//!     .set_permission("guardian", &Permission::some_msgs(["bank.Send"]).unwrap())
//!     .unwrap();
//! storage.disable("bank.Send").unwrap();
//!
//! assert!(storage.is_disabled("bank.Send").unwrap());
//! assert!(!storage.is_disabled("gov.Vote").unwrap());
//! ```

pub mod models;
pub mod storage;

pub use models::{Permission, PermissionGrant, PermissionLevel, Result, StoreError};
pub use storage::{Storage, StoreTx};

// Transaction helpers so callers of `Storage::transaction` need no direct sled dependency.
pub use sled::transaction::{abort, ConflictableTransactionResult as TxResult};
