//! The circuit breaker facade.
//!
//! [`CircuitBreaker`] owns the store and exposes the three command entry
//! points (Authorize, Trip, Reset), the read-only queries, genesis
//! import/export, and the [`AdmissionFilter`] used on the message path.
//!
//! # Command Pipeline
//!
//! Every command runs the same steps:
//! 1. Shape validation (`InvalidArgument`), before any storage access
//! 2. One store transaction that loads the signer's permission, asks the
//!    evaluator, and either aborts (`Unauthorized`) or applies every write
//! 3. Audit event returned to the caller and, if enabled, logged
//!
//! Nothing is written unless every check for the whole request passes.

use crate::{
    admission::AdmissionFilter,
    audit::{AuditEvent, Operation},
    config::CircuitConfig,
    error::CircuitError,
    evaluator,
    genesis::{GenesisAccount, GenesisState},
    request::{AuthorizeRequest, ResetRequest, TripRequest},
    Result,
};

use circuit_store::{abort, Permission, PermissionGrant, Storage, StoreTx, TxResult};
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// The circuit breaker access-control engine.
///
/// # Example
///
/// ```rust
/// use circuit_core::{AuthorizeRequest, CircuitBreaker, CircuitConfig, TripRequest};
/// use circuit_store::{PermissionLevel, Storage};
///
/// let mut config = CircuitConfig::default();
/// config.authority.bootstrap_authorities = vec!["gov".to_string()];
/// let breaker = CircuitBreaker::with_storage(config, Storage::temporary().unwrap()).unwrap();
///
/// breaker
///     .authorize(&AuthorizeRequest::new(
///         "gov",
///         "guardian",
///         PermissionLevel::SomeMsgs,
///         vec!["bank.Send".to_string()],
///     ))
///     .unwrap();
/// breaker.trip(&TripRequest::new("guardian", vec!["bank.Send"])).unwrap();
///
/// assert!(breaker.check_admission("bank.Send").unwrap_err().is_tripped());
/// assert!(breaker.check_admission("gov.Vote").is_ok());
/// ```
pub struct CircuitBreaker {
    /// Configuration.
    config: CircuitConfig,

    /// Permission and circuit state.
    storage: Storage,

    /// Accounts treated as `SUPER_ADMIN`.
    bootstrap_authorities: BTreeSet<String>,

    /// Serializes commands issued through this engine.
    write_lock: Mutex<()>,
}

impl CircuitBreaker {
    /// Opens the database named in `config` and creates the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub fn new(config: CircuitConfig) -> Result<Self> {
        config.validate()?;
        let storage = Storage::open(&config.store.db_path)?;
        Self::with_storage(config, storage)
    }

    /// Creates the engine over an already-open store.
    pub fn with_storage(config: CircuitConfig, storage: Storage) -> Result<Self> {
        config.validate()?;
        let bootstrap_authorities: BTreeSet<String> = config
            .authority
            .bootstrap_authorities
            .iter()
            .cloned()
            .collect();

        info!(
            "Circuit breaker initialized with {} bootstrap authorities",
            bootstrap_authorities.len()
        );

        Ok(Self {
            config,
            storage,
            bootstrap_authorities,
            write_lock: Mutex::new(()),
        })
    }

    /// Grants `request.permission` to `request.grantee`.
    ///
    /// Level `NONE` revokes; any other level overwrites what the grantee held.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the request is malformed (checked first, so
    ///   this holds regardless of who signed it)
    /// - `Unauthorized` if the granter is not `SUPER_ADMIN`
    /// - `Storage` on backend failure
    pub fn authorize(&self, request: &AuthorizeRequest) -> Result<AuditEvent> {
        let permission = request.validate()?;
        debug!(
            "Authorize: {} grants {} to {}",
            request.granter,
            permission.level(),
            request.grantee
        );

        let _guard = self.lock_writes();
        self.storage.transaction::<_, CircuitError, _>(|tx| {
            let granter = self.effective_permission(tx, &request.granter)?;
            if !evaluator::can_authorize(&granter) {
                return abort(CircuitError::unauthorized(
                    &request.granter,
                    "is not SUPER_ADMIN and cannot grant permissions",
                ));
            }
            tx.set_permission(&request.grantee, &permission)
        })
        .map_err(|e| {
            warn!("Authorize by '{}' rejected: {}", request.granter, e);
            e
        })?;

        info!(
            "Permission for '{}' set to {} by '{}'",
            request.grantee, permission, request.granter
        );

        let event = AuditEvent::authorize(
            &request.granter,
            &request.grantee,
            permission.level(),
            permission.limit_type_urls(),
        );
        self.emit(&event);
        Ok(event)
    }

    /// Disables every type identifier in the request.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the list is empty or contains a malformed entry
    /// - `Unauthorized` if the authority may not trip any one of them, in
    ///   which case nothing is disabled
    /// - `Storage` on backend failure
    pub fn trip(&self, request: &TripRequest) -> Result<AuditEvent> {
        let type_urls = request.validate()?;
        self.apply_circuit_change(Operation::Trip, &request.authority, type_urls)
    }

    /// Re-enables every type identifier in the request.
    ///
    /// Resetting an identifier that is already enabled succeeds and changes
    /// nothing. Errors are the same as for [`trip`](Self::trip).
    pub fn reset(&self, request: &ResetRequest) -> Result<AuditEvent> {
        let type_urls = request.validate()?;
        self.apply_circuit_change(Operation::Reset, &request.authority, type_urls)
    }

    fn apply_circuit_change(
        &self,
        operation: Operation,
        authority: &str,
        type_urls: Vec<String>,
    ) -> Result<AuditEvent> {
        debug!("{}: '{}' requests {:?}", operation, authority, type_urls);

        let _guard = self.lock_writes();
        self.storage.transaction::<_, CircuitError, _>(|tx| {
            let permission = self.effective_permission(tx, authority)?;
            if let Some(denied) = evaluator::first_unauthorized(&permission, &type_urls) {
                return abort(CircuitError::unauthorized(
                    authority,
                    format!("holds {} and cannot {} '{}'", permission.level(), operation, denied),
                ));
            }

            for type_url in &type_urls {
                if operation == Operation::Trip {
                    tx.disable(type_url)?;
                } else {
                    tx.enable(type_url)?;
                }
            }
            Ok(())
        })
        .map_err(|e| {
            warn!("{} by '{}' rejected: {}", operation, authority, e);
            e
        })?;

        info!("{} committed by '{}': {:?}", operation, authority, type_urls);

        let event = AuditEvent::circuit(authority, operation, type_urls);
        self.emit(&event);
        Ok(event)
    }

    /// Permission used for authorization: bootstrap authorities are always
    /// `SUPER_ADMIN`, everyone else holds what is stored.
    fn effective_permission(
        &self,
        tx: &StoreTx<'_, CircuitError>,
        account: &str,
    ) -> TxResult<Permission, CircuitError> {
        if self.bootstrap_authorities.contains(account) {
            return Ok(Permission::SuperAdmin);
        }
        tx.get_permission(account)
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The guarded value is `()`, so a poisoned lock carries no bad state.
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: &AuditEvent) {
        if self.config.global.audit_logging {
            event.record();
        }
    }

    /// Returns the stored permission of `account`.
    ///
    /// Bootstrap authorities report what is stored for them, not their
    /// implicit `SUPER_ADMIN`.
    pub fn permission(&self, account: &str) -> Result<Permission> {
        Ok(self.storage.get_permission(account)?)
    }

    /// Lists every account holding a permission.
    pub fn accounts(&self) -> Result<Vec<(String, Permission)>> {
        Ok(self.storage.list_permissions()?)
    }

    /// Lists every disabled type identifier.
    pub fn disabled_list(&self) -> Result<Vec<String>> {
        Ok(self.storage.list_disabled()?)
    }

    /// Returns true if `type_url` is disabled.
    pub fn is_disabled(&self, type_url: &str) -> Result<bool> {
        Ok(self.storage.is_disabled(type_url)?)
    }

    /// Returns true if `account` is a configured bootstrap authority.
    pub fn is_bootstrap_authority(&self, account: &str) -> bool {
        self.bootstrap_authorities.contains(account)
    }

    /// Returns an admission filter sharing this engine's store.
    pub fn admission_filter(&self) -> AdmissionFilter {
        AdmissionFilter::new(self.storage.clone(), self.config.global.fail_closed)
    }

    /// Runs the admission check for one message type.
    pub fn check_admission(&self, type_url: &str) -> Result<()> {
        self.admission_filter().check(type_url)
    }

    /// Loads genesis state into an empty store, all or nothing.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if the store already holds state or the genesis
    ///   document is invalid
    /// - `Storage` on backend failure
    ///
    /// Commands issued through this engine wait until the import finishes,
    /// so they land either before it (and the import fails) or after it.
    pub fn init_genesis(&self, genesis: &GenesisState) -> Result<()> {
        let accounts = genesis.validate()?;

        // Held across the emptiness check and the write so no command
        // commits in between.
        let _guard = self.lock_writes();
        if !self.storage.is_empty() {
            return Err(CircuitError::InvalidArgument(
                "genesis can only be imported into an empty store".to_string(),
            ));
        }

        self.storage.transaction::<_, CircuitError, _>(|tx| {
            for (address, permission) in &accounts {
                tx.set_permission(address, permission)?;
            }
            for type_url in &genesis.disabled_type_urls {
                tx.disable(type_url)?;
            }
            Ok(())
        })?;

        info!(
            "Genesis imported: {} accounts, {} disabled types",
            accounts.len(),
            genesis.disabled_type_urls.len()
        );
        Ok(())
    }

    /// Exports the current state as a genesis document.
    pub fn export_genesis(&self) -> Result<GenesisState> {
        let accounts = self
            .storage
            .list_permissions()?
            .into_iter()
            .map(|(address, permission)| GenesisAccount {
                address,
                permission: PermissionGrant::from(permission),
            })
            .collect();

        Ok(GenesisState {
            accounts,
            disabled_type_urls: self.storage.list_disabled()?,
        })
    }

    /// Flushes pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.storage.flush()?;
        Ok(())
    }

    /// The active configuration.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_store::PermissionLevel;
    use tempfile::TempDir;

    fn breaker() -> CircuitBreaker {
        let mut config = CircuitConfig::default();
        config.authority.bootstrap_authorities = vec!["gov".to_string()];
        CircuitBreaker::with_storage(config, Storage::temporary().unwrap()).unwrap()
    }

    fn grant(breaker: &CircuitBreaker, grantee: &str, level: PermissionLevel, urls: &[&str]) {
        breaker
            .authorize(&AuthorizeRequest::new(
                "gov",
                grantee,
                level,
                urls.iter().map(|s| s.to_string()).collect(),
            ))
            .unwrap();
    }

    #[test]
    fn test_breaker_creation_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = CircuitConfig::default();
        config.store.db_path = temp_dir.path().join("circuit.db");
        assert!(CircuitBreaker::new(config).is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = CircuitConfig::default();
        config.authority.bootstrap_authorities = vec![String::new()];
        let result = CircuitBreaker::with_storage(config, Storage::temporary().unwrap());
        assert!(matches!(result, Err(CircuitError::Config(_))));
    }

    #[test]
    fn test_bootstrap_authority_authorizes() {
        let breaker = breaker();
        let event = breaker
            .authorize(&AuthorizeRequest::new("gov", "admin", PermissionLevel::SuperAdmin, vec![]))
            .unwrap();

        assert_eq!(event.operation, Operation::Authorize);
        assert_eq!(breaker.permission("admin").unwrap(), Permission::SuperAdmin);
        assert_eq!(breaker.permission("gov").unwrap(), Permission::NoAccess);
        assert!(breaker.is_bootstrap_authority("gov"));
    }

    #[test]
    fn test_granted_super_admin_can_delegate() {
        let breaker = breaker();
        grant(&breaker, "admin", PermissionLevel::SuperAdmin, &[]);

        breaker
            .authorize(&AuthorizeRequest::new("admin", "ops", PermissionLevel::AllMsgs, vec![]))
            .unwrap();
        assert_eq!(breaker.permission("ops").unwrap(), Permission::AllMsgs);
    }

    #[test]
    fn test_all_msgs_cannot_authorize() {
        let breaker = breaker();
        grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);

        let err = breaker
            .authorize(&AuthorizeRequest::new("ops", "other", PermissionLevel::AllMsgs, vec![]))
            .unwrap_err();
        assert!(matches!(err, CircuitError::Unauthorized { ref actor, .. } if actor == "ops"));
        assert_eq!(breaker.permission("other").unwrap(), Permission::NoAccess);
    }

    #[test]
    fn test_trip_returns_event() {
        let breaker = breaker();
        grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);

        let event = breaker
            .trip(&TripRequest::new("ops", vec!["bank.Send", "gov.Vote", "bank.Send"]))
            .unwrap();

        assert_eq!(event.actor, "ops");
        assert_eq!(event.operation, Operation::Trip);
        assert_eq!(event.type_urls, vec!["bank.Send", "gov.Vote"]);
        assert_eq!(breaker.disabled_list().unwrap(), vec!["bank.Send", "gov.Vote"]);
    }

    #[test]
    fn test_unauthorized_message_names_type() {
        let breaker = breaker();
        grant(&breaker, "guardian", PermissionLevel::SomeMsgs, &["bank.Send"]);

        let err = breaker
            .trip(&TripRequest::new("guardian", vec!["bank.Send", "gov.Vote"]))
            .unwrap_err();
        assert!(err.to_string().contains("gov.Vote"));
    }

    #[test]
    fn test_revoke_by_granting_none() {
        let breaker = breaker();
        grant(&breaker, "ops", PermissionLevel::AllMsgs, &[]);
        grant(&breaker, "ops", PermissionLevel::None, &[]);

        assert!(breaker.accounts().unwrap().is_empty());
        let err = breaker.trip(&TripRequest::new("ops", vec!["bank.Send"])).unwrap_err();
        assert!(matches!(err, CircuitError::Unauthorized { .. }));
    }

    #[test]
    fn test_admission_filter_shares_store() {
        let breaker = breaker();
        let filter = breaker.admission_filter();

        breaker.trip(&TripRequest::new("gov", vec!["bank.Send"])).unwrap();
        assert!(!filter.is_admitted("bank.Send"));

        breaker.reset(&ResetRequest::new("gov", vec!["bank.Send"])).unwrap();
        assert!(filter.is_admitted("bank.Send"));
    }

    #[test]
    fn test_genesis_requires_empty_store() {
        let breaker = breaker();
        breaker.trip(&TripRequest::new("gov", vec!["bank.Send"])).unwrap();

        let err = breaker.init_genesis(&GenesisState::default()).unwrap_err();
        assert!(matches!(err, CircuitError::InvalidArgument(_)));
    }

    #[test]
    fn test_genesis_races_with_trip() {
        let genesis = GenesisState {
            accounts: vec![GenesisAccount {
                address: "admin".to_string(),
                permission: PermissionGrant::new(PermissionLevel::SuperAdmin, vec![]),
            }],
            disabled_type_urls: vec!["gov.Vote".to_string()],
        };

        for _ in 0..20 {
            let breaker = breaker();
            let (imported, tripped) = std::thread::scope(|scope| {
                let import = scope.spawn(|| breaker.init_genesis(&genesis));
                let trip = scope.spawn(|| {
                    breaker.trip(&TripRequest::new("gov", vec!["bank.Send"]))
                });
                (import.join().unwrap(), trip.join().unwrap())
            });
            assert!(tripped.is_ok());

            let disabled = breaker.disabled_list().unwrap();
            if imported.is_ok() {
                assert_eq!(disabled, vec!["bank.Send", "gov.Vote"]);
                assert_eq!(breaker.permission("admin").unwrap(), Permission::SuperAdmin);
            } else {
                assert_eq!(disabled, vec!["bank.Send"]);
                assert!(breaker.accounts().unwrap().is_empty());
            }
        }
    }
}
