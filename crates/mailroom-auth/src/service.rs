//! Authentication service: login, session resolution and logout.

use chrono::{DateTime, Duration, Utc};
use mailroom_core::error::{FieldError, MailroomError, MailroomResult};
use mailroom_core::models::audit::{AuditAction, CreateAuditLogEntry};
use mailroom_core::models::session::CreateSession;
use mailroom_core::models::user::User;
use mailroom_core::repository::{AuditLogRepository, SessionRepository, UserRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    pub user: User,
    /// Raw opaque session token (return to client, not stored).
    pub session_token: String,
    pub session_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U: UserRepository, S: SessionRepository, A: AuditLogRepository> {
    user_repo: U,
    session_repo: S,
    audit_repo: A,
    config: AuthConfig,
}

impl<U, S, A> AuthService<U, S, A>
where
    U: UserRepository,
    S: SessionRepository,
    A: AuditLogRepository,
{
    pub fn new(user_repo: U, session_repo: S, audit_repo: A, config: AuthConfig) -> Self {
        Self {
            user_repo,
            session_repo,
            audit_repo,
            config,
        }
    }

    /// Shape check on login input, run before any lookup. Reports every
    /// failing field.
    pub fn validate_login(&self, username: &str, password: &str) -> MailroomResult<()> {
        let mut errors = Vec::new();
        if username.chars().count() < self.config.min_username_length {
            errors.push(FieldError::new(
                "username",
                format!(
                    "must be at least {} characters",
                    self.config.min_username_length
                ),
            ));
        }
        if password.chars().count() < self.config.min_password_length {
            errors.push(FieldError::new(
                "password",
                format!(
                    "must be at least {} characters",
                    self.config.min_password_length
                ),
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MailroomError::Validation { errors })
        }
    }

    /// Check a username/password pair.
    ///
    /// An unknown username, an inactive account and a wrong password
    /// all fail with the same [`AuthError::InvalidCredentials`]. The
    /// unknown-username path still pays for one Argon2 verification.
    pub async fn authenticate(&self, username: &str, password: &str) -> MailroomResult<User> {
        let pepper = self.config.pepper.as_deref();

        let user = match self.user_repo.get_by_username(username).await {
            Ok(u) => u,
            Err(MailroomError::NotFound { .. }) => {
                password::verify_dummy(password, pepper);
                warn!("login failed");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let valid = password::verify_password(password, &user.password_hash, pepper)?;

        if !valid || !user.is_active {
            warn!(user_id = %user.id, "login failed");
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user)
    }

    /// Authenticate and open a session.
    ///
    /// `lastLoginAt` and the `LOGIN` audit entry are best-effort: a
    /// failure is logged and the login still succeeds.
    pub async fn login(&self, input: LoginInput) -> MailroomResult<LoginOutput> {
        self.validate_login(&input.username, &input.password)?;
        let mut user = self.authenticate(&input.username, &input.password).await?;

        let raw_token = token::generate_session_token();
        let token_hash = token::hash_session_token(&raw_token);
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.config.session_lifetime_secs as i64);

        let session = self
            .session_repo
            .create(CreateSession {
                user_id: user.id,
                token_hash,
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent,
                expires_at,
            })
            .await?;

        match self.user_repo.record_login(user.id, now).await {
            Ok(()) => user.last_login_at = Some(now),
            Err(e) => warn!(user_id = %user.id, error = %e, "failed to record last login"),
        }

        if let Err(e) = self
            .audit_repo
            .record(CreateAuditLogEntry {
                user_id: user.id,
                action: AuditAction::Login,
                target_user_id: None,
                details: serde_json::json!({ "ipAddress": input.ip_address }),
            })
            .await
        {
            warn!(user_id = %user.id, error = %e, "failed to record login audit entry");
        }

        info!(user_id = %user.id, role = %user.role, "user logged in");

        Ok(LoginOutput {
            user,
            session_token: raw_token,
            session_id: session.id,
            expires_at,
        })
    }

    /// Resolve a raw session token to the current principal.
    ///
    /// Expired sessions are deleted on sight. A session whose user has
    /// been deactivated (or no longer exists) does not authenticate.
    pub async fn resolve(&self, raw_token: &str) -> MailroomResult<User> {
        let token_hash = token::hash_session_token(raw_token);
        let session = self
            .session_repo
            .get_by_token_hash(&token_hash)
            .await
            .map_err(|e| match e {
                MailroomError::NotFound { .. } => AuthError::SessionNotFound.into(),
                other => other,
            })?;

        if session.expires_at <= Utc::now() {
            if let Err(e) = self.session_repo.invalidate(session.id).await {
                warn!(session_id = %session.id, error = %e, "failed to drop expired session");
            }
            return Err(AuthError::SessionExpired.into());
        }

        let user = match self.user_repo.get_by_id(session.user_id).await {
            Ok(u) => u,
            Err(MailroomError::NotFound { .. }) => return Err(MailroomError::Unauthenticated),
            Err(e) => return Err(e),
        };

        if !user.is_active {
            debug!(user_id = %user.id, "session rejected for inactive user");
            return Err(MailroomError::Unauthenticated);
        }

        Ok(user)
    }

    /// End the session behind `raw_token`. Unknown tokens are ignored.
    pub async fn logout(&self, raw_token: &str) -> MailroomResult<()> {
        let token_hash = token::hash_session_token(raw_token);
        match self.session_repo.get_by_token_hash(&token_hash).await {
            Ok(session) => {
                self.session_repo.invalidate(session.id).await?;
                info!(user_id = %session.user_id, "user logged out");
                Ok(())
            }
            Err(MailroomError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Revoke all sessions for a user (e.g. on password change).
    pub async fn revoke_all_sessions(&self, user_id: Uuid) -> MailroomResult<()> {
        self.session_repo.invalidate_user_sessions(user_id).await
    }

    /// Delete expired sessions; returns how many were removed.
    pub async fn sweep_expired(&self) -> MailroomResult<u64> {
        self.session_repo.cleanup_expired().await
    }
}
