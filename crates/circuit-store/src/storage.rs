//! # Persistent Storage Layer
//!
//! Sled-backed persistence for the two pieces of circuit breaker state:
//! which account holds which permission, and which type identifiers are
//! currently disabled.
//!
//! ## Storage Structure
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `permissions` | account | JSON `PermissionGrant` | Permission Store |
//! | `disabled` | type identifier | marker byte | Circuit State Store |
//!
//! An account with no entry holds `NONE`; a type identifier with no entry is
//! enabled. Writing `NONE` removes the account's entry.
//!
//! ## Atomicity
//!
//! Single-key writes go straight to the trees. Commands that must read and
//! write several keys as one unit use [`Storage::transaction`], which runs a
//! closure against a [`StoreTx`] view spanning both trees. Sled may re-run the
//! closure on conflict, so it must not have side effects outside the view.
//!
//! ## References
//!
//! - Sled documentation: <https://sled.rs/>

use crate::models::{Permission, Result, StoreError};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::Transactional;
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

/// Tree name for account permissions.
const PERMISSION_TREE: &str = "permissions";

/// Tree name for disabled type identifiers.
const DISABLED_TREE: &str = "disabled";

/// Value stored against a disabled type identifier.
const DISABLED_MARKER: &[u8] = &[1];

/// Wrapper around a Sled database holding circuit breaker state.
///
/// # Thread Safety
///
/// The underlying Sled database is thread-safe and `Storage` is cheap to
/// clone; clones share the same trees.
///
/// # Example
///
/// ```rust
/// use circuit_store::{Permission, Storage};
///
/// let storage = Storage::temporary().unwrap();
///
/// storage.set_permission("alice", &Permission::AllMsgs).unwrap();
/// assert_eq!(storage.get_permission("alice").unwrap(), Permission::AllMsgs);
///
/// storage.disable("bank.Send").unwrap();
/// assert!(storage.is_disabled("bank.Send").unwrap());
/// ```
#[derive(Clone)]
pub struct Storage {
    /// The underlying Sled database.
    db: sled::Db,

    /// Account → permission.
    permissions: sled::Tree,

    /// Disabled type identifiers.
    disabled: sled::Tree,
}

impl Storage {
    /// Opens or creates a storage database at the given path.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the path is invalid, permissions
    /// are insufficient, or the database is corrupted.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates a temporary in-memory storage for testing.
    ///
    /// The database is lost when the last clone of the `Storage` is dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let permissions = db.open_tree(PERMISSION_TREE)?;
        let disabled = db.open_tree(DISABLED_TREE)?;

        Ok(Storage {
            db,
            permissions,
            disabled,
        })
    }

    /// Loads the permission held by `account`.
    ///
    /// Accounts with no stored entry hold [`Permission::NoAccess`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` on read failure and
    /// `StoreError::Serialization` if the stored value is corrupted.
    pub fn get_permission(&self, account: &str) -> Result<Permission> {
        match self.permissions.get(account.as_bytes())? {
            Some(bytes) => decode_permission(&bytes),
            None => Ok(Permission::NoAccess),
        }
    }

    /// Stores `permission` for `account`, overwriting any previous value.
    ///
    /// Storing [`Permission::NoAccess`] removes the entry.
    pub fn set_permission(&self, account: &str, permission: &Permission) -> Result<()> {
        let key = account.as_bytes();
        if permission.is_no_access() {
            self.permissions.remove(key)?;
        } else {
            self.permissions.insert(key, encode_permission(permission)?)?;
        }
        Ok(())
    }

    /// Lists every account holding a permission, in lexicographic order.
    pub fn list_permissions(&self) -> Result<Vec<(String, Permission)>> {
        let mut accounts = Vec::new();

        for result in self.permissions.iter() {
            let (key, value) = result?;
            let account = decode_key(&key, PERMISSION_TREE)?;
            accounts.push((account, decode_permission(&value)?));
        }

        Ok(accounts)
    }

    /// Returns true if `type_url` is disabled.
    pub fn is_disabled(&self, type_url: &str) -> Result<bool> {
        Ok(self.disabled.contains_key(type_url.as_bytes())?)
    }

    /// Marks `type_url` as disabled. Idempotent.
    pub fn disable(&self, type_url: &str) -> Result<()> {
        self.disabled.insert(type_url.as_bytes(), DISABLED_MARKER)?;
        Ok(())
    }

    /// Clears the disabled mark on `type_url`. Idempotent.
    pub fn enable(&self, type_url: &str) -> Result<()> {
        self.disabled.remove(type_url.as_bytes())?;
        Ok(())
    }

    /// Lists every disabled type identifier, in lexicographic order.
    pub fn list_disabled(&self) -> Result<Vec<String>> {
        let mut type_urls = Vec::new();

        for result in self.disabled.iter() {
            let (key, _) = result?;
            type_urls.push(decode_key(&key, DISABLED_TREE)?);
        }

        Ok(type_urls)
    }

    /// Returns true if no permissions are stored and nothing is disabled.
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.disabled.is_empty()
    }

    /// Runs `f` as one atomic transaction over both trees.
    ///
    /// Reads inside `f` see a consistent view; writes become visible to other
    /// readers only if `f` returns `Ok`. Returning an abort error from `f`
    /// discards every write made inside it.
    ///
    /// # Errors
    ///
    /// Returns the abort error produced by `f`, or a `StoreError::Database`
    /// converted into `E` if sled fails to commit.
    ///
    /// # Example
    ///
    /// ```rust
    /// use circuit_store::{Permission, Storage, StoreError};
    ///
    /// let storage = Storage::temporary().unwrap();
    /// storage
    ///     .transaction::<_, StoreError, _>(|tx| {
    ///         tx.set_permission("alice", &Permission::SuperAdmin)?;
    ///         tx.disable("bank.Send")?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    ///
    /// assert!(storage.is_disabled("bank.Send").unwrap());
    /// ```
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: Fn(&StoreTx<'_, E>) -> ConflictableTransactionResult<T, E>,
        E: From<StoreError>,
    {
        (&self.permissions, &self.disabled)
            .transaction(|(permissions, disabled)| {
                f(&StoreTx {
                    permissions,
                    disabled,
                    _error: PhantomData,
                })
            })
            .map_err(|err| match err {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => E::from(StoreError::Database(e)),
            })
    }

    /// Flushes all pending writes to disk.
    ///
    /// Returns the number of bytes flushed.
    pub fn flush(&self) -> Result<usize> {
        let flushed = self.db.flush()?;
        debug!(bytes = flushed, "circuit store flushed");
        Ok(flushed)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("accounts", &self.permissions.len())
            .field("disabled", &self.disabled.len())
            .finish()
    }
}

/// Transactional view over both trees, handed to [`Storage::transaction`].
///
/// Every method returns a sled `ConflictableTransactionResult` in the
/// transaction's own error type `E`, so it can be used with `?` inside the
/// closure. Store failures become an abort carrying `E::from(StoreError)`.
pub struct StoreTx<'a, E> {
    permissions: &'a TransactionalTree,
    disabled: &'a TransactionalTree,
    _error: PhantomData<fn() -> E>,
}

impl<E: From<StoreError>> StoreTx<'_, E> {
    /// Transactional [`Storage::get_permission`].
    pub fn get_permission(&self, account: &str) -> ConflictableTransactionResult<Permission, E> {
        match self.permissions.get(account.as_bytes())? {
            Some(bytes) => decode_permission(&bytes).map_err(abort),
            None => Ok(Permission::NoAccess),
        }
    }

    /// Transactional [`Storage::set_permission`].
    pub fn set_permission(
        &self,
        account: &str,
        permission: &Permission,
    ) -> ConflictableTransactionResult<(), E> {
        let key = account.as_bytes();
        if permission.is_no_access() {
            self.permissions.remove(key)?;
        } else {
            let value = encode_permission(permission).map_err(abort)?;
            self.permissions.insert(key, value)?;
        }
        Ok(())
    }

    /// Transactional [`Storage::is_disabled`].
    pub fn is_disabled(&self, type_url: &str) -> ConflictableTransactionResult<bool, E> {
        Ok(self.disabled.get(type_url.as_bytes())?.is_some())
    }

    /// Transactional [`Storage::disable`].
    pub fn disable(&self, type_url: &str) -> ConflictableTransactionResult<(), E> {
        self.disabled.insert(type_url.as_bytes(), DISABLED_MARKER)?;
        Ok(())
    }

    /// Transactional [`Storage::enable`].
    pub fn enable(&self, type_url: &str) -> ConflictableTransactionResult<(), E> {
        self.disabled.remove(type_url.as_bytes())?;
        Ok(())
    }
}

fn abort<E: From<StoreError>>(err: StoreError) -> ConflictableTransactionError<E> {
    ConflictableTransactionError::Abort(E::from(err))
}

fn encode_permission(permission: &Permission) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(permission)?)
}

fn decode_permission(bytes: &[u8]) -> Result<Permission> {
    Ok(serde_json::from_slice(bytes)?)
}

fn decode_key(key: &[u8], tree: &'static str) -> Result<String> {
    String::from_utf8(key.to_vec()).map_err(|_| StoreError::CorruptKey(tree))
}
