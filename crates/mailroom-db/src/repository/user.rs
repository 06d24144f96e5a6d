//! SurrealDB implementation of [`UserRepository`].
//!
//! Credentials arrive already hashed; this layer never sees a
//! plaintext password.

use chrono::{DateTime, NaiveDate, Utc};
use mailroom_core::error::MailroomResult;
use mailroom_core::models::audit::AuditStamp;
use mailroom_core::models::user::{NewUser, Role, UpdateUser, User, UserFilter, UserStats};
use mailroom_core::repository::UserRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use super::{CountRow, audited, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

const SELECT_USER: &str = "SELECT meta::id(id) AS record_id, * FROM user";

#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    domain_id: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid("user", &self.record_id)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            domain_id: parse_opt_uuid("domain", self.domain_id.as_deref())?,
            role: self.role.parse::<Role>().map_err(DbError::Decode)?,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login_at: self.last_login_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_one(
        &self,
        query: &str,
        key: &'static str,
        value: String,
    ) -> Result<User, DbError> {
        let mut result = self
            .db
            .query(query)
            .bind((key, value.clone()))
            .await?;

        let rows: Vec<UserRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: format!("{key}={value}"),
        })?;

        row.try_into_user()
    }

    async fn is_taken(&self, username: &str, email: &str) -> Result<bool, DbError> {
        let taken = self
            .count(
                "WHERE username = $username OR email = $email",
                vec![("username", username.to_string()), ("email", email.to_string())],
            )
            .await?;
        Ok(taken > 0)
    }

    async fn count(
        &self,
        condition: &str,
        binds: Vec<(&'static str, String)>,
    ) -> Result<u64, DbError> {
        let query = format!("SELECT count() AS total FROM user {condition} GROUP ALL");
        let mut builder = self.db.query(&query);
        for bind in binds {
            builder = builder.bind(bind);
        }
        let mut result = builder.await?;
        let rows: Vec<CountRow> = result.take(0)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: NewUser, stamp: AuditStamp) -> MailroomResult<User> {
        // The unique indexes remain authoritative under concurrent
        // inserts; this only gives the common case a clean conflict.
        if self.is_taken(&input.username, &input.email).await? {
            return Err(DbError::Duplicate {
                entity: "user".into(),
            }
            .into());
        }

        let id = Uuid::new_v4();
        let (username, email) = (input.username.clone(), input.email.clone());

        let query = audited(
            "CREATE type::record('user', $id) SET \
             username = $username, email = $email, \
             password_hash = $password_hash, \
             first_name = $first_name, last_name = $last_name, \
             domain_id = $domain_id, role = $role, \
             is_active = true, last_login_at = NONE",
        );

        let builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("first_name", input.first_name))
            .bind(("last_name", input.last_name))
            .bind(("domain_id", input.domain_id.map(|d| d.to_string())))
            .bind(("role", input.role.as_str().to_string()));

        let outcome = match bind_audit!(builder, stamp, Some(id)).await {
            Ok(mut response) => DbError::check_statements("user", response.take_errors()),
            Err(e) => Err(DbError::from(e)),
        };
        if let Err(err) = outcome {
            // A racing insert can abort this transaction with a commit
            // conflict instead of an index error.
            let maybe_raced = matches!(err, DbError::Query(_) | DbError::Surreal(_));
            if maybe_raced && self.is_taken(&username, &email).await? {
                return Err(DbError::Duplicate {
                    entity: "user".into(),
                }
                .into());
            }
            return Err(err.into());
        }

        debug!(user_id = %id, "user created");
        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> MailroomResult<User> {
        let query = "SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)";
        Ok(self.fetch_one(query, "id", id.to_string()).await?)
    }

    async fn get_by_username(&self, username: &str) -> MailroomResult<User> {
        let query = format!("{SELECT_USER} WHERE username = $username");
        Ok(self
            .fetch_one(&query, "username", username.to_string())
            .await?)
    }

    async fn update(&self, id: Uuid, input: UpdateUser, stamp: AuditStamp) -> MailroomResult<User> {
        // Records are never hard-deleted, so existence cannot change
        // between this check and the write.
        self.get_by_id(id).await?;

        let mut sets = Vec::new();
        if input.first_name.is_some() {
            sets.push("first_name = $first_name");
        }
        if input.last_name.is_some() {
            sets.push("last_name = $last_name");
        }
        if input.role.is_some() {
            sets.push("role = $role");
        }
        if input.is_active.is_some() {
            sets.push("is_active = $is_active");
        }
        if input.last_login_at.is_some() {
            sets.push("last_login_at = $last_login_at");
        }
        sets.push("updated_at = time::now()");

        let query = audited(&format!(
            "UPDATE type::record('user', $id) SET {}",
            sets.join(", ")
        ));

        let mut builder = self.db.query(&query).bind(("id", id.to_string()));

        if let Some(first_name) = input.first_name {
            builder = builder.bind(("first_name", first_name));
        }
        if let Some(last_name) = input.last_name {
            builder = builder.bind(("last_name", last_name));
        }
        if let Some(role) = input.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(is_active) = input.is_active {
            builder = builder.bind(("is_active", is_active));
        }
        if let Some(last_login_at) = input.last_login_at {
            builder = builder.bind(("last_login_at", last_login_at));
        }

        let mut response = bind_audit!(builder, stamp, Some(id))
            .await
            .map_err(DbError::from)?;
        DbError::check_statements("user", response.take_errors())?;

        self.get_by_id(id).await
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
        stamp: AuditStamp,
    ) -> MailroomResult<()> {
        self.get_by_id(id).await?;

        let query = audited(
            "UPDATE type::record('user', $id) SET \
             password_hash = $password_hash, updated_at = time::now()",
        );
        let builder = self
            .db
            .query(&query)
            .bind(("id", id.to_string()))
            .bind(("password_hash", password_hash));

        let mut response = bind_audit!(builder, stamp, Some(id))
            .await
            .map_err(DbError::from)?;
        DbError::check_statements("user", response.take_errors())?;

        Ok(())
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> MailroomResult<()> {
        self.db
            .query("UPDATE type::record('user', $id) SET last_login_at = $at")
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list(&self, filter: UserFilter) -> MailroomResult<Vec<User>> {
        let mut conditions = Vec::new();
        if filter.role.is_some() {
            conditions.push("role = $role");
        }
        if filter.search.is_some() {
            conditions.push(
                "(first_name CONTAINS $search \
                 OR last_name CONTAINS $search \
                 OR email CONTAINS $search)",
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let query = format!("{SELECT_USER} {where_clause} ORDER BY created_at DESC");

        let mut builder = self.db.query(&query);
        if let Some(role) = filter.role {
            builder = builder.bind(("role", role.as_str().to_string()));
        }
        if let Some(search) = filter.search {
            builder = builder.bind(("search", search));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;

        let users = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(users)
    }

    async fn stats(&self, today: NaiveDate) -> MailroomResult<UserStats> {
        let start = today.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = start + chrono::Duration::days(1);

        let total = self.count("", Vec::new()).await?;
        let super_admins = self
            .count(
                "WHERE role = $role",
                vec![("role", Role::SuperAdmin.as_str().to_string())],
            )
            .await?;
        let admins = self
            .count(
                "WHERE role = $role",
                vec![("role", Role::Admin.as_str().to_string())],
            )
            .await?;
        let clients = self
            .count(
                "WHERE role = $role",
                vec![("role", Role::Client.as_str().to_string())],
            )
            .await?;

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM user \
                 WHERE is_active = true \
                 AND last_login_at >= $start AND last_login_at < $end \
                 GROUP ALL",
            )
            .bind(("start", start))
            .bind(("end", end))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let active_today = rows.first().map(|r| r.total).unwrap_or(0);

        Ok(UserStats {
            total,
            super_admins,
            admins,
            clients,
            active_today,
        })
    }
}
