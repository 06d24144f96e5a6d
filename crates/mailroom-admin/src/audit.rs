//! Audit log reads.

use mailroom_core::error::MailroomResult;
use mailroom_core::models::audit::{AuditLogEntry, AuditLogFilter};
use mailroom_core::models::user::User;
use mailroom_core::policy;
use mailroom_core::repository::AuditLogRepository;

use crate::validation;

pub struct AuditService<L: AuditLogRepository> {
    log: L,
    default_limit: u64,
}

impl<L: AuditLogRepository> AuditService<L> {
    pub fn new(log: L, default_limit: u64) -> Self {
        Self { log, default_limit }
    }

    /// Admin or above. Most recent first.
    pub async fn list(
        &self,
        actor: Option<&User>,
        filter: AuditLogFilter,
        limit: Option<u64>,
    ) -> MailroomResult<Vec<AuditLogEntry>> {
        policy::require_admin_or_above(actor)?;
        let limit = limit.unwrap_or(self.default_limit);
        validation::validate_audit_limit(limit)?;
        self.log.list(filter, limit).await
    }
}
