//! # Permission Model
//!
//! Types persisted by the circuit store: the permission an account holds and
//! the wire shape used to grant it.
//!
//! ## Permission Levels
//!
//! | Level | Code | May trip/reset | May authorize |
//! |-------|------|----------------|---------------|
//! | `NONE` | 0 | nothing | no |
//! | `SOME_MSGS` | 1 | its allow-list only | no |
//! | `ALL_MSGS` | 2 | any type | no |
//! | `SUPER_ADMIN` | 3 | any type | yes |
//!
//! A [`Permission`] is a closed set of cases. `SOME_MSGS` carries its
//! allow-list inline so a scoped permission without a scope cannot be built.
//! [`PermissionGrant`] is the flat `{level, limit_type_urls}` shape that
//! requests and stored values use; converting a grant into a permission is
//! where the shape is checked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Level of access an account holds over the circuit breaker.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    /// No access.
    #[default]
    None,

    /// May trip or reset the type identifiers on its allow-list.
    SomeMsgs,

    /// May trip or reset any type identifier.
    AllMsgs,

    /// May trip or reset any type identifier and grant permissions.
    SuperAdmin,
}

impl PermissionLevel {
    /// All levels, lowest first.
    pub const ALL: [PermissionLevel; 4] = [
        PermissionLevel::None,
        PermissionLevel::SomeMsgs,
        PermissionLevel::AllMsgs,
        PermissionLevel::SuperAdmin,
    ];

    /// Numeric code of this level.
    pub fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::SomeMsgs => 1,
            Self::AllMsgs => 2,
            Self::SuperAdmin => 3,
        }
    }

    /// Looks up a level by its numeric code.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.code() == code)
    }

    /// Canonical upper-case name of this level.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::SomeMsgs => "SOME_MSGS",
            Self::AllMsgs => "ALL_MSGS",
            Self::SuperAdmin => "SUPER_ADMIN",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = StoreError;

    /// Parses either a numeric code (`"1"`) or a name (`"some_msgs"`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Ok(code) = trimmed.parse::<u8>() {
            return Self::from_code(code)
                .ok_or_else(|| StoreError::InvalidPermission(format!("unknown level code {code}")));
        }

        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| StoreError::InvalidPermission(format!("unknown level '{trimmed}'")))
    }
}

/// Flat `{level, limit_type_urls}` form of a permission.
///
/// This is what an Authorize request carries and what gets written to the
/// store. It may be inconsistent (for example `SOME_MSGS` with no type
/// identifiers); use [`Permission::try_from`] to validate it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Requested level.
    pub level: PermissionLevel,

    /// Allow-list for `SOME_MSGS`. Ignored for every other level.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limit_type_urls: Vec<String>,
}

impl PermissionGrant {
    /// Creates a grant.
    pub fn new(level: PermissionLevel, limit_type_urls: Vec<String>) -> Self {
        Self {
            level,
            limit_type_urls,
        }
    }
}

/// Permission attached to a single account.
///
/// Absence of a stored permission reads back as [`Permission::NoAccess`].
///
/// # Example
///
/// ```rust
/// use circuit_store::{Permission, PermissionGrant, PermissionLevel};
///
/// let grant = PermissionGrant::new(PermissionLevel::SomeMsgs, vec!["bank.Send".to_string()]);
/// let permission = Permission::try_from(grant).unwrap();
/// assert_eq!(permission.level(), PermissionLevel::SomeMsgs);
///
/// let empty = PermissionGrant::new(PermissionLevel::SomeMsgs, vec![]);
/// assert!(Permission::try_from(empty).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PermissionGrant", into = "PermissionGrant")]
pub enum Permission {
    /// No access (level `NONE`).
    #[default]
    NoAccess,

    /// Scoped to a non-empty allow-list of type identifiers (level `SOME_MSGS`).
    SomeMsgs(BTreeSet<String>),

    /// Any type identifier (level `ALL_MSGS`).
    AllMsgs,

    /// Any type identifier, plus granting permissions (level `SUPER_ADMIN`).
    SuperAdmin,
}

impl Permission {
    /// Builds a scoped permission from an allow-list.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPermission` if the allow-list is empty.
    pub fn some_msgs<I, S>(type_urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let urls: BTreeSet<String> = type_urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(StoreError::InvalidPermission(
                "SOME_MSGS requires at least one limit type url".to_string(),
            ));
        }
        Ok(Self::SomeMsgs(urls))
    }

    /// The level of this permission.
    pub fn level(&self) -> PermissionLevel {
        match self {
            Self::NoAccess => PermissionLevel::None,
            Self::SomeMsgs(_) => PermissionLevel::SomeMsgs,
            Self::AllMsgs => PermissionLevel::AllMsgs,
            Self::SuperAdmin => PermissionLevel::SuperAdmin,
        }
    }

    /// The allow-list, empty unless this is `SOME_MSGS`.
    pub fn limit_type_urls(&self) -> Vec<String> {
        match self {
            Self::SomeMsgs(urls) => urls.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Returns true for `NONE`.
    pub fn is_no_access(&self) -> bool {
        matches!(self, Self::NoAccess)
    }
}

impl TryFrom<PermissionGrant> for Permission {
    type Error = StoreError;

    fn try_from(grant: PermissionGrant) -> Result<Self> {
        match grant.level {
            PermissionLevel::None => Ok(Self::NoAccess),
            PermissionLevel::SomeMsgs => Self::some_msgs(grant.limit_type_urls),
            PermissionLevel::AllMsgs => Ok(Self::AllMsgs),
            PermissionLevel::SuperAdmin => Ok(Self::SuperAdmin),
        }
    }
}

impl From<Permission> for PermissionGrant {
    fn from(permission: Permission) -> Self {
        let level = permission.level();
        let limit_type_urls = match permission {
            Permission::SomeMsgs(urls) => urls.into_iter().collect(),
            _ => Vec::new(),
        };
        PermissionGrant {
            level,
            limit_type_urls,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SomeMsgs(urls) => {
                let list: Vec<&str> = urls.iter().map(String::as_str).collect();
                write!(f, "{} [{}]", self.level(), list.join(", "))
            }
            other => write!(f, "{}", other.level()),
        }
    }
}

/// Errors that can occur in the circuit store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open, read or write the database.
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a stored value.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A permission with an inconsistent shape.
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// A stored key is not valid UTF-8.
    #[error("Corrupt key in tree '{0}'")]
    CorruptKey(&'static str),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
