//! SurrealDB repository implementations.

use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Appends one `audit_log` row. Spliced into the same transaction as
/// the privileged write it describes; the caller binds the parameters
/// with [`bind_audit!`].
pub(crate) const APPEND_AUDIT: &str = "CREATE type::record('audit_log', $audit_id) SET \
     user_id = $audit_actor, \
     action = $audit_action, \
     target_user_id = $audit_target, \
     details = $audit_details";

/// Wrap `write` and the audit append in a single transaction so that
/// neither is committed without the other.
pub(crate) fn audited(write: &str) -> String {
    format!("BEGIN TRANSACTION;\n{write};\n{APPEND_AUDIT};\nCOMMIT TRANSACTION;")
}

/// Bind the `$audit_*` parameters used by [`APPEND_AUDIT`].
macro_rules! bind_audit {
    ($query:expr, $stamp:expr, $target:expr) => {
        $query
            .bind(("audit_id", ::uuid::Uuid::new_v4().to_string()))
            .bind(("audit_actor", $stamp.actor_id.to_string()))
            .bind(("audit_action", $stamp.action.as_str().to_string()))
            .bind((
                "audit_target",
                $target.map(|t: ::uuid::Uuid| t.to_string()),
            ))
            .bind(("audit_details", $crate::repository::details_object($stamp.details)))
    };
}

/// The `details` column is an object; wrap anything else.
pub(crate) fn details_object(details: serde_json::Value) -> serde_json::Value {
    match details {
        serde_json::Value::Object(_) => details,
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => serde_json::json!({ "value": other }),
    }
}

pub(crate) fn parse_uuid(field: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(field: &str, raw: Option<&str>) -> Result<Option<Uuid>, DbError> {
    raw.map(|r| parse_uuid(field, r)).transpose()
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

mod audit;
mod domain;
mod message;
mod session;
mod user;

pub use audit::SurrealAuditLogRepository;
pub use domain::SurrealDomainRepository;
pub use message::SurrealMessageRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audited_wraps_write_in_transaction() {
        let sql = audited("UPDATE type::record('user', $id) SET is_active = false");
        assert!(sql.starts_with("BEGIN TRANSACTION;"));
        assert!(sql.trim_end().ends_with("COMMIT TRANSACTION;"));
        let write_at = sql.find("UPDATE").unwrap();
        let audit_at = sql.find("audit_log").unwrap();
        assert!(write_at < audit_at, "write must precede the audit append");
    }

    #[test]
    fn details_are_always_objects() {
        assert!(details_object(serde_json::Value::Null).is_object());
        assert_eq!(
            details_object(serde_json::json!(true)),
            serde_json::json!({ "value": true })
        );
        let obj = serde_json::json!({ "role": "admin" });
        assert_eq!(details_object(obj.clone()), obj);
    }
}
