//! User management handlers.

use chrono::Utc;
use mailroom_auth::AuthConfig;
use mailroom_auth::password;
use mailroom_core::error::{MailroomError, MailroomResult};
use mailroom_core::models::audit::{AuditAction, AuditStamp, SYSTEM_ACTOR};
use mailroom_core::models::user::{
    CreateUser, NewUser, Role, UpdateUser, User, UserFilter, UserStats,
};
use mailroom_core::policy;
use mailroom_core::repository::{DomainRepository, UserRepository};
use tracing::info;
use uuid::Uuid;

use crate::validation;

/// User handlers. Domains are consulted to check `domainId` references.
pub struct UserService<U: UserRepository, D: DomainRepository> {
    users: U,
    domains: D,
    config: AuthConfig,
}

impl<U: UserRepository, D: DomainRepository> UserService<U, D> {
    pub fn new(users: U, domains: D, config: AuthConfig) -> Self {
        Self {
            users,
            domains,
            config,
        }
    }

    /// Admin or above. Newest first; `role` and `search` intersect.
    pub async fn list_users(
        &self,
        actor: Option<&User>,
        filter: UserFilter,
    ) -> MailroomResult<Vec<User>> {
        policy::require_admin_or_above(actor)?;
        let filter = UserFilter {
            search: filter.search.filter(|s| !s.is_empty()),
            ..filter
        };
        self.users.list(filter).await
    }

    /// Admin or above. "Active today" is evaluated against the current
    /// UTC date.
    pub async fn stats(&self, actor: Option<&User>) -> MailroomResult<UserStats> {
        policy::require_admin_or_above(actor)?;
        self.users.stats(Utc::now().date_naive()).await
    }

    /// Super admin only.
    pub async fn create_user(
        &self,
        actor: Option<&User>,
        input: CreateUser,
    ) -> MailroomResult<User> {
        let actor = policy::require_super_admin(actor)?;
        self.insert(actor.id, input).await
    }

    /// Admin or above, subject to [`policy::may_update_user`].
    pub async fn update_user(
        &self,
        actor: Option<&User>,
        id: Uuid,
        patch: UpdateUser,
    ) -> MailroomResult<User> {
        let actor = policy::require_admin_or_above(actor)?;
        if patch.is_empty() {
            return Err(MailroomError::invalid("body", "no updatable fields supplied"));
        }

        let target = self.users.get_by_id(id).await?;
        policy::may_update_user(actor, &target, patch.role)?;

        let stamp = AuditStamp::new(actor.id, AuditAction::UpdateUser, patch_details(&patch));
        let updated = self.users.update(id, patch, stamp).await?;

        info!(actor_id = %actor.id, user_id = %id, "user updated");
        Ok(updated)
    }

    /// Create the first super admin from the operator CLI. Refused once
    /// any super admin exists.
    pub async fn bootstrap_super_admin(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> MailroomResult<User> {
        let stats = self.users.stats(Utc::now().date_naive()).await?;
        if stats.super_admins > 0 {
            return Err(MailroomError::AlreadyExists {
                entity: "super admin".into(),
            });
        }

        self.insert(
            SYSTEM_ACTOR,
            CreateUser {
                username,
                email,
                first_name: None,
                last_name: None,
                role: Role::SuperAdmin,
                domain_id: None,
                temp_password: password,
            },
        )
        .await
    }

    /// Replace a user's password on behalf of `actor_id`. Operator path:
    /// no gate runs here. The caller is expected to revoke the user's
    /// sessions afterwards.
    pub async fn reset_password(
        &self,
        actor_id: Uuid,
        username: &str,
        new_password: &str,
    ) -> MailroomResult<User> {
        if let Some(error) = validation::password_length(
            "password",
            new_password,
            self.config.min_password_length,
        ) {
            return Err(MailroomError::Validation {
                errors: vec![error],
            });
        }

        let user = self.users.get_by_username(username).await?;
        let hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        self.users
            .set_password_hash(
                user.id,
                hash,
                AuditStamp::new(actor_id, AuditAction::ResetPassword, serde_json::json!({})),
            )
            .await?;

        info!(actor_id = %actor_id, user_id = %user.id, "password reset");
        Ok(user)
    }

    async fn insert(&self, actor_id: Uuid, input: CreateUser) -> MailroomResult<User> {
        validation::validate_create_user(&input, self.config.min_password_length)?;

        if let Some(domain_id) = input.domain_id {
            match self.domains.get_by_id(domain_id).await {
                Ok(_) => {}
                Err(MailroomError::NotFound { .. }) => {
                    return Err(MailroomError::invalid("domainId", "unknown domain"));
                }
                Err(e) => return Err(e),
            }
        }

        let password_hash =
            password::hash_password(&input.temp_password, self.config.pepper.as_deref())?;
        let email = input.email.trim().to_string();
        let stamp = AuditStamp::new(
            actor_id,
            AuditAction::CreateUser,
            serde_json::json!({ "userEmail": email, "userRole": input.role }),
        );

        let user = self
            .users
            .create(
                NewUser {
                    username: input.username.trim().to_string(),
                    email,
                    password_hash,
                    first_name: input.first_name,
                    last_name: input.last_name,
                    role: input.role,
                    domain_id: input.domain_id,
                },
                stamp,
            )
            .await?;

        info!(actor_id = %actor_id, user_id = %user.id, role = %user.role, "user created");
        Ok(user)
    }
}

/// The audit payload for an update: the supplied fields only.
fn patch_details(patch: &UpdateUser) -> serde_json::Value {
    match serde_json::to_value(patch) {
        Ok(serde_json::Value::Object(map)) => serde_json::Value::Object(
            map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        ),
        _ => serde_json::json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_details_keep_only_supplied_fields() {
        let details = patch_details(&UpdateUser {
            role: Some(Role::Admin),
            is_active: Some(false),
            ..Default::default()
        });
        assert_eq!(details, serde_json::json!({ "role": "admin", "isActive": false }));
    }
}
