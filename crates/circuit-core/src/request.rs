//! Command payloads accepted by the circuit breaker.
//!
//! The signer field of each request (`granter` or `authority`) is the
//! authenticated account that submitted it. Verifying that signature is the
//! caller's job; these types only check the payload's shape.

use crate::{
    error::CircuitError,
    type_url::{normalize_type_urls, validate_type_url},
    Result,
};
use circuit_store::{Permission, PermissionGrant, PermissionLevel};
use serde::{Deserialize, Serialize};

/// Grant `permission` to `grantee`. Must be signed by a `SUPER_ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    /// Signing account.
    pub granter: String,

    /// Account receiving the permission.
    pub grantee: String,

    /// Requested permission. Level `NONE` revokes.
    pub permission: PermissionGrant,
}

impl AuthorizeRequest {
    /// Creates an authorize request.
    pub fn new(
        granter: impl Into<String>,
        grantee: impl Into<String>,
        level: PermissionLevel,
        limit_type_urls: Vec<String>,
    ) -> Self {
        Self {
            granter: granter.into(),
            grantee: grantee.into(),
            permission: PermissionGrant::new(level, limit_type_urls),
        }
    }

    /// Checks the request shape and returns the permission to store.
    ///
    /// # Errors
    ///
    /// Returns `CircuitError::InvalidArgument` if an account is blank,
    /// `SOME_MSGS` has no type identifiers, or one of them is malformed.
    pub fn validate(&self) -> Result<Permission> {
        require_account("granter", &self.granter)?;
        require_account("grantee", &self.grantee)?;
        to_permission(&self.permission)
    }
}

/// Disable every listed type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRequest {
    /// Signing account.
    pub authority: String,

    /// Type identifiers to disable.
    pub type_urls: Vec<String>,
}

impl TripRequest {
    /// Creates a trip request.
    pub fn new<S: Into<String>>(authority: impl Into<String>, type_urls: Vec<S>) -> Self {
        Self {
            authority: authority.into(),
            type_urls: type_urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the request shape and returns the de-duplicated identifiers.
    pub fn validate(&self) -> Result<Vec<String>> {
        require_account("authority", &self.authority)?;
        normalize_type_urls(&self.type_urls)
    }
}

/// Re-enable every listed type identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRequest {
    /// Signing account.
    pub authority: String,

    /// Type identifiers to re-enable.
    pub type_urls: Vec<String>,
}

impl ResetRequest {
    /// Creates a reset request.
    pub fn new<S: Into<String>>(authority: impl Into<String>, type_urls: Vec<S>) -> Self {
        Self {
            authority: authority.into(),
            type_urls: type_urls.into_iter().map(Into::into).collect(),
        }
    }

    /// Checks the request shape and returns the de-duplicated identifiers.
    pub fn validate(&self) -> Result<Vec<String>> {
        require_account("authority", &self.authority)?;
        normalize_type_urls(&self.type_urls)
    }
}

/// Converts a grant into a permission, validating scoped identifiers.
pub(crate) fn to_permission(grant: &PermissionGrant) -> Result<Permission> {
    if grant.level == PermissionLevel::SomeMsgs {
        for type_url in &grant.limit_type_urls {
            validate_type_url(type_url)?;
        }
    }
    Permission::try_from(grant.clone()).map_err(|e| CircuitError::InvalidArgument(e.to_string()))
}

pub(crate) fn require_account(field: &str, account: &str) -> Result<()> {
    if account.trim().is_empty() {
        return Err(CircuitError::InvalidArgument(format!("{field} account is empty")));
    }
    Ok(())
}
