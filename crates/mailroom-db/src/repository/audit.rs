//! SurrealDB implementation of [`AuditLogRepository`].
//!
//! The table is append-only: the schema denies update and delete, and
//! this type exposes no way to issue either.

use chrono::{DateTime, Utc};
use mailroom_core::error::MailroomResult;
use mailroom_core::models::audit::{AuditLogEntry, AuditLogFilter, CreateAuditLogEntry};
use mailroom_core::repository::AuditLogRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{details_object, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditRow {
    record_id: String,
    user_id: String,
    action: String,
    target_user_id: Option<String>,
    details: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn try_into_entry(self) -> Result<AuditLogEntry, DbError> {
        Ok(AuditLogEntry {
            id: parse_uuid("audit_log", &self.record_id)?,
            user_id: parse_uuid("actor", &self.user_id)?,
            action: self.action,
            target_user_id: parse_opt_uuid("target", self.target_user_id.as_deref())?,
            details: self.details,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the audit log repository.
#[derive(Clone)]
pub struct SurrealAuditLogRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditLogRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AuditLogRepository for SurrealAuditLogRepository<C> {
    async fn record(&self, input: CreateAuditLogEntry) -> MailroomResult<AuditLogEntry> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "CREATE type::record('audit_log', $id) SET \
                 user_id = $user_id, action = $action, \
                 target_user_id = $target_user_id, details = $details",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("target_user_id", input.target_user_id.map(|t| t.to_string())))
            .bind(("details", details_object(input.details)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('audit_log', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "audit_log".into(),
            id: id_str,
        })?;

        Ok(row.try_into_entry()?)
    }

    async fn list(&self, filter: AuditLogFilter, limit: u64) -> MailroomResult<Vec<AuditLogEntry>> {
        let mut conditions = Vec::new();
        if filter.actor_id.is_some() {
            conditions.push("user_id = $actor_id");
        }
        if filter.target_user_id.is_some() {
            conditions.push("target_user_id = $target_user_id");
        }
        if filter.action.is_some() {
            conditions.push("action = $action");
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM audit_log {where_clause} \
             ORDER BY created_at DESC LIMIT $limit"
        );

        let mut builder = self.db.query(&query).bind(("limit", limit));
        if let Some(actor_id) = filter.actor_id {
            builder = builder.bind(("actor_id", actor_id.to_string()));
        }
        if let Some(target) = filter.target_user_id {
            builder = builder.bind(("target_user_id", target.to_string()));
        }
        if let Some(action) = filter.action {
            builder = builder.bind(("action", action));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AuditRow> = result.take(0).map_err(DbError::from)?;

        let entries = rows
            .into_iter()
            .map(AuditRow::try_into_entry)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(entries)
    }
}
