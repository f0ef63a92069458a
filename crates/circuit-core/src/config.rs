//! Configuration types for the circuit breaker.

use crate::{error::CircuitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the circuit breaker engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Storage configuration.
    pub store: StoreConfig,

    /// Bootstrap authority configuration.
    pub authority: AuthorityConfig,

    /// Global settings.
    pub global: GlobalConfig,
}

impl CircuitConfig {
    /// Parses a TOML document. Missing sections take their defaults.
    ///
    /// # Example
    ///
    /// ```rust
    /// use circuit_core::CircuitConfig;
    ///
    /// let config = CircuitConfig::from_toml_str(
    ///     r#"
    ///     [authority]
    ///     bootstrap_authorities = ["gov"]
    ///     "#,
    /// )
    /// .unwrap();
    /// assert_eq!(config.authority.bootstrap_authorities, vec!["gov"]);
    /// assert!(config.global.fail_closed);
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| CircuitError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `CircuitError::Config` if the file cannot be read, does not
    /// parse, or fails [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CircuitError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Checks the configuration for values the engine cannot use.
    pub fn validate(&self) -> Result<()> {
        if self.store.db_path.as_os_str().is_empty() {
            return Err(CircuitError::Config("store.db_path is empty".to_string()));
        }
        if self
            .authority
            .bootstrap_authorities
            .iter()
            .any(|account| account.trim().is_empty())
        {
            return Err(CircuitError::Config(
                "authority.bootstrap_authorities contains a blank account".to_string(),
            ));
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the sled database directory.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./circuit_state.db"),
        }
    }
}

/// Bootstrap authority configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Accounts treated as `SUPER_ADMIN` regardless of stored permission.
    pub bootstrap_authorities: Vec<String>,
}

/// Global settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Fail-closed mode: a storage failure during admission rejects the
    /// message instead of admitting it.
    pub fail_closed: bool,

    /// Write an audit log line for every committed command.
    pub audit_logging: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            fail_closed: true,
            audit_logging: true,
        }
    }
}
