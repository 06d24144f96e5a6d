//! Audit log domain model.
//!
//! The audit log is append-only: entries are never updated or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Actor id used for changes made from the operator CLI rather than by
/// an authenticated user.
pub const SYSTEM_ACTOR: Uuid = Uuid::nil();

/// Tags for audited actions. Stored as their `SCREAMING_SNAKE_CASE`
/// string; the stored column itself is free-form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    CreateUser,
    UpdateUser,
    ResetPassword,
    CreateDomain,
    UpdateDomainStatus,
    Login,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::CreateUser => "CREATE_USER",
            AuditAction::UpdateUser => "UPDATE_USER",
            AuditAction::ResetPassword => "RESET_PASSWORD",
            AuditAction::CreateDomain => "CREATE_DOMAIN",
            AuditAction::UpdateDomainStatus => "UPDATE_DOMAIN_STATUS",
            AuditAction::Login => "LOGIN",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    /// The actor.
    pub user_id: Uuid,
    pub action: String,
    pub target_user_id: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// A standalone audit record (the fire-and-forget path).
#[derive(Debug, Clone)]
pub struct CreateAuditLogEntry {
    pub user_id: Uuid,
    pub action: AuditAction,
    pub target_user_id: Option<Uuid>,
    pub details: serde_json::Value,
}

/// Who is performing a privileged write and why.
///
/// Repositories accept a stamp alongside every privileged mutation and
/// append the matching [`AuditLogEntry`] in the same transaction. The
/// target is derived from the mutated record: the user id for account
/// writes, none for domain writes.
#[derive(Debug, Clone)]
pub struct AuditStamp {
    pub actor_id: Uuid,
    pub action: AuditAction,
    pub details: serde_json::Value,
}

impl AuditStamp {
    pub fn new(actor_id: Uuid, action: AuditAction, details: serde_json::Value) -> Self {
        Self {
            actor_id,
            action,
            details,
        }
    }
}

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
    pub action: Option<String>,
}
