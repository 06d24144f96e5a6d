//! Domain handlers. Every operation is super admin only.

use mailroom_core::error::MailroomResult;
use mailroom_core::models::audit::{AuditAction, AuditStamp};
use mailroom_core::models::domain::{CreateDomain, Domain};
use mailroom_core::models::user::User;
use mailroom_core::policy;
use mailroom_core::repository::DomainRepository;
use tracing::info;
use uuid::Uuid;

use crate::validation;

pub struct DomainService<D: DomainRepository> {
    domains: D,
}

impl<D: DomainRepository> DomainService<D> {
    pub fn new(domains: D) -> Self {
        Self { domains }
    }

    pub async fn list(&self, actor: Option<&User>) -> MailroomResult<Vec<Domain>> {
        policy::require_super_admin(actor)?;
        self.domains.list().await
    }

    /// Names are stored lowercased so uniqueness is case-insensitive.
    pub async fn create(
        &self,
        actor: Option<&User>,
        input: CreateDomain,
    ) -> MailroomResult<Domain> {
        let actor = policy::require_super_admin(actor)?;
        validation::validate_create_domain(&input)?;

        let input = CreateDomain {
            domain: input.domain.trim().to_ascii_lowercase(),
            description: input.description.filter(|d| !d.trim().is_empty()),
        };
        let stamp = AuditStamp::new(
            actor.id,
            AuditAction::CreateDomain,
            serde_json::json!({ "domain": input.domain }),
        );
        let domain = self.domains.create(input, actor.id, stamp).await?;

        info!(actor_id = %actor.id, domain = %domain.domain, "domain created");
        Ok(domain)
    }

    /// Idempotent on the row; each call is audited.
    pub async fn set_active(
        &self,
        actor: Option<&User>,
        id: Uuid,
        is_active: bool,
    ) -> MailroomResult<Domain> {
        let actor = policy::require_super_admin(actor)?;
        let stamp = AuditStamp::new(
            actor.id,
            AuditAction::UpdateDomainStatus,
            serde_json::json!({ "domainId": id, "isActive": is_active }),
        );
        let domain = self.domains.set_active(id, is_active, stamp).await?;

        info!(actor_id = %actor.id, domain_id = %id, is_active, "domain status changed");
        Ok(domain)
    }
}
