//! Genesis import and export of circuit breaker state.
//!
//! ```json
//! {
//!   "accounts": [
//!     { "address": "guardian", "permission": { "level": "SOME_MSGS", "limit_type_urls": ["bank.Send"] } }
//!   ],
//!   "disabled_type_urls": ["gov.Vote"]
//! }
//! ```

use crate::{
    error::CircuitError,
    request::{require_account, to_permission},
    type_url::validate_type_url,
    Result,
};
use circuit_store::{Permission, PermissionGrant};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One account and the permission it starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Account address.
    pub address: String,

    /// Permission held by the account.
    pub permission: PermissionGrant,
}

/// Full circuit breaker state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    /// Accounts holding a permission.
    #[serde(default)]
    pub accounts: Vec<GenesisAccount>,

    /// Type identifiers that start disabled.
    #[serde(default)]
    pub disabled_type_urls: Vec<String>,
}

impl GenesisState {
    /// Parses a JSON genesis document.
    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| CircuitError::Config(e.to_string()))
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CircuitError::Config(e.to_string()))
    }

    /// Validates every entry, returning the permissions to store.
    ///
    /// Applies the same rules as the Authorize, Trip and Reset commands.
    /// Addresses and disabled identifiers must be unique, and no account may
    /// hold `NONE`, so that exporting after an import yields the same document.
    pub fn validate(&self) -> Result<Vec<(String, Permission)>> {
        let mut seen = HashSet::new();
        let mut accounts = Vec::with_capacity(self.accounts.len());

        for account in &self.accounts {
            require_account("genesis", &account.address)?;
            if !seen.insert(account.address.as_str()) {
                return Err(CircuitError::InvalidArgument(format!(
                    "duplicate genesis account '{}'",
                    account.address
                )));
            }
            let permission = to_permission(&account.permission)?;
            if permission.is_no_access() {
                return Err(CircuitError::InvalidArgument(format!(
                    "genesis account '{}' holds NONE",
                    account.address
                )));
            }
            accounts.push((account.address.clone(), permission));
        }

        let mut disabled = HashSet::new();
        for type_url in &self.disabled_type_urls {
            validate_type_url(type_url)?;
            if !disabled.insert(type_url.as_str()) {
                return Err(CircuitError::InvalidArgument(format!(
                    "duplicate disabled type url '{type_url}'"
                )));
            }
        }

        Ok(accounts)
    }
}
