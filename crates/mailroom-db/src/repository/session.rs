//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use mailroom_core::error::MailroomResult;
use mailroom_core::models::session::{CreateSession, Session};
use mailroom_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRow {
    record_id: String,
    user_id: String,
    token_hash: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid("session", &self.record_id)?,
            user_id: parse_uuid("user", &self.user_id)?,
            token_hash: self.token_hash,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> MailroomResult<Session> {
        let id = Uuid::new_v4();
        let token_hash = input.token_hash.clone();

        let mut response = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 user_id = $user_id, \
                 token_hash = $token_hash, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 expires_at = $expires_at",
            )
            .bind(("id", id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("token_hash", input.token_hash))
            .bind(("ip_address", input.ip_address))
            .bind(("user_agent", input.user_agent))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;
        DbError::check_statements("session", response.take_errors())?;

        self.get_by_token_hash(&token_hash).await
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> MailroomResult<Session> {
        let token_hash_owned = token_hash.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        // The hash itself is a credential; keep it out of error text.
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: "token".into(),
        })?;

        Ok(row.try_into_session()?)
    }

    async fn invalidate(&self, id: Uuid) -> MailroomResult<()> {
        self.db
            .query("DELETE type::record('session', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn invalidate_user_sessions(&self, user_id: Uuid) -> MailroomResult<()> {
        self.db
            .query("DELETE session WHERE user_id = $user_id")
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> MailroomResult<u64> {
        // Both statements share one cutoff so the count matches what the
        // DELETE removes.
        let now = Utc::now();

        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM session WHERE expires_at < $now GROUP ALL")
            .bind(("now", now))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        if total > 0 {
            self.db
                .query("DELETE session WHERE expires_at < $now")
                .bind(("now", now))
                .await
                .map_err(DbError::from)?
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;
            debug!(removed = total, "expired sessions removed");
        }

        Ok(total)
    }
}
