//! SurrealDB implementation of [`DomainRepository`].

use chrono::{DateTime, Utc};
use mailroom_core::error::MailroomResult;
use mailroom_core::models::audit::AuditStamp;
use mailroom_core::models::domain::{CreateDomain, Domain};
use mailroom_core::repository::DomainRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, audited, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct DomainRow {
    record_id: String,
    domain: String,
    description: Option<String>,
    is_active: bool,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl DomainRow {
    fn try_into_domain(self) -> Result<Domain, DbError> {
        Ok(Domain {
            id: parse_uuid("domain", &self.record_id)?,
            domain: self.domain,
            description: self.description,
            is_active: self.is_active,
            created_by: parse_uuid("creator", &self.created_by)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Domain repository.
#[derive(Clone)]
pub struct SurrealDomainRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealDomainRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn is_taken(&self, domain: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT count() AS total FROM domain WHERE domain = $domain GROUP ALL")
            .bind(("domain", domain.to_string()))
            .await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}

impl<C: Connection> DomainRepository for SurrealDomainRepository<C> {
    async fn create(
        &self,
        input: CreateDomain,
        created_by: Uuid,
        stamp: AuditStamp,
    ) -> MailroomResult<Domain> {
        if self.is_taken(&input.domain).await? {
            return Err(DbError::Duplicate {
                entity: "domain".into(),
            }
            .into());
        }

        let id = Uuid::new_v4();
        let name = input.domain.clone();

        let query = audited(
            "CREATE type::record('domain', $id) SET \
             domain = $domain, description = $description, \
             is_active = true, created_by = $created_by",
        );
        let builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("domain", input.domain))
            .bind(("description", input.description))
            .bind(("created_by", created_by.to_string()));

        let outcome = match bind_audit!(builder, stamp, None::<Uuid>).await {
            Ok(mut response) => DbError::check_statements("domain", response.take_errors()),
            Err(e) => Err(DbError::from(e)),
        };
        if let Err(err) = outcome {
            let maybe_raced = matches!(err, DbError::Query(_) | DbError::Surreal(_));
            if maybe_raced && self.is_taken(&name).await? {
                return Err(DbError::Duplicate {
                    entity: "domain".into(),
                }
                .into());
            }
            return Err(err.into());
        }

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> MailroomResult<Domain> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('domain', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DomainRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "domain".into(),
            id: id_str,
        })?;

        Ok(row.try_into_domain()?)
    }

    async fn list(&self) -> MailroomResult<Vec<Domain>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM domain ORDER BY created_at DESC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<DomainRow> = result.take(0).map_err(DbError::from)?;
        let domains = rows
            .into_iter()
            .map(DomainRow::try_into_domain)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(domains)
    }

    async fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
        stamp: AuditStamp,
    ) -> MailroomResult<Domain> {
        self.get_by_id(id).await?;

        // Setting the current value again is a no-op on the row but is
        // still recorded.
        let query = audited("UPDATE type::record('domain', $id) SET is_active = $is_active");
        let builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("is_active", is_active));

        let mut response = bind_audit!(builder, stamp, None::<Uuid>)
            .await
            .map_err(DbError::from)?;
        DbError::check_statements("domain", response.take_errors())?;

        self.get_by_id(id).await
    }
}
