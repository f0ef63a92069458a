//! Audit events emitted by committed commands.

use circuit_store::PermissionLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use uuid::Uuid;

/// Command that produced an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A permission was granted or revoked.
    Authorize,
    /// Type identifiers were disabled.
    Trip,
    /// Type identifiers were re-enabled.
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authorize => f.write_str("authorize"),
            Self::Trip => f.write_str("trip"),
            Self::Reset => f.write_str("reset"),
        }
    }
}

/// Record of one successful command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event id.
    pub id: Uuid,

    /// Account that issued the command.
    pub actor: String,

    /// Which command ran.
    pub operation: Operation,

    /// Account whose permission changed (authorize only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grantee: Option<String>,

    /// Level granted (authorize only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<PermissionLevel>,

    /// Affected type identifiers. For authorize, the granted allow-list.
    pub type_urls: Vec<String>,
}

impl AuditEvent {
    pub(crate) fn authorize(
        actor: &str,
        grantee: &str,
        level: PermissionLevel,
        type_urls: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            operation: Operation::Authorize,
            grantee: Some(grantee.to_string()),
            level: Some(level),
            type_urls,
        }
    }

    pub(crate) fn circuit(actor: &str, operation: Operation, type_urls: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            operation,
            grantee: None,
            level: None,
            type_urls,
        }
    }

    /// Writes the event to the `circuit::audit` log target.
    pub fn record(&self) {
        info!(
            target: "circuit::audit",
            event_id = %self.id,
            actor = %self.actor,
            operation = %self.operation,
            grantee = ?self.grantee,
            level = ?self.level,
            type_urls = ?self.type_urls,
            "circuit command committed"
        );
    }
}
