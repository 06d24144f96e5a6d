//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Privileged writes take an
//! [`AuditStamp`] and must persist the write and its audit entry
//! atomically.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::MailroomResult;
use crate::models::{
    audit::{AuditLogEntry, AuditLogFilter, AuditStamp, CreateAuditLogEntry},
    domain::{CreateDomain, Domain},
    message::{Folder, Message, MessageStatus, NewMessage},
    session::{CreateSession, Session},
    user::{NewUser, UpdateUser, User, UserFilter, UserStats},
};

// ---------------------------------------------------------------------------
// Credential store
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    /// Insert a new account. Fails with `AlreadyExists` on a duplicate
    /// username or email.
    fn create(
        &self,
        input: NewUser,
        stamp: AuditStamp,
    ) -> impl Future<Output = MailroomResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MailroomResult<User>> + Send;
    fn get_by_username(&self, username: &str)
    -> impl Future<Output = MailroomResult<User>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateUser,
        stamp: AuditStamp,
    ) -> impl Future<Output = MailroomResult<User>> + Send;
    /// Replace the stored credential hash.
    fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
        stamp: AuditStamp,
    ) -> impl Future<Output = MailroomResult<()>> + Send;
    /// Stamp `last_login_at`. Not audited.
    fn record_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = MailroomResult<()>> + Send;
    /// Newest first.
    fn list(&self, filter: UserFilter) -> impl Future<Output = MailroomResult<Vec<User>>> + Send;
    /// Counts, with "active today" meaning an active account whose last
    /// login falls on `today` (UTC calendar date).
    fn stats(&self, today: NaiveDate) -> impl Future<Output = MailroomResult<UserStats>> + Send;
}

pub trait DomainRepository: Send + Sync {
    /// Fails with `AlreadyExists` on a duplicate domain name.
    fn create(
        &self,
        input: CreateDomain,
        created_by: Uuid,
        stamp: AuditStamp,
    ) -> impl Future<Output = MailroomResult<Domain>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = MailroomResult<Domain>> + Send;
    /// Newest first.
    fn list(&self) -> impl Future<Output = MailroomResult<Vec<Domain>>> + Send;
    fn set_active(
        &self,
        id: Uuid,
        is_active: bool,
        stamp: AuditStamp,
    ) -> impl Future<Output = MailroomResult<Domain>> + Send;
}

// ---------------------------------------------------------------------------
// Owner-scoped messages
// ---------------------------------------------------------------------------

/// Every lookup is scoped to an owner; a message owned by someone else
/// is reported as `NotFound`.
pub trait MessageRepository: Send + Sync {
    fn create(&self, input: NewMessage) -> impl Future<Output = MailroomResult<Message>> + Send;
    fn get_for_owner(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = MailroomResult<Message>> + Send;
    /// Newest first.
    fn list_for_owner(
        &self,
        owner_id: Uuid,
        folder: Folder,
    ) -> impl Future<Output = MailroomResult<Vec<Message>>> + Send;
    fn update_status(
        &self,
        owner_id: Uuid,
        id: Uuid,
        status: MessageStatus,
    ) -> impl Future<Output = MailroomResult<Message>> + Send;
    fn move_to_folder(
        &self,
        owner_id: Uuid,
        id: Uuid,
        folder: Folder,
    ) -> impl Future<Output = MailroomResult<Message>> + Send;
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = MailroomResult<Session>> + Send;
    fn get_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = MailroomResult<Session>> + Send;
    /// Delete a single session.
    fn invalidate(&self, id: Uuid) -> impl Future<Output = MailroomResult<()>> + Send;
    /// Delete every session belonging to a user.
    fn invalidate_user_sessions(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = MailroomResult<()>> + Send;
    /// Delete expired sessions, returning how many were removed.
    fn cleanup_expired(&self) -> impl Future<Output = MailroomResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only)
// ---------------------------------------------------------------------------

pub trait AuditLogRepository: Send + Sync {
    /// Append a standalone entry. No update or delete operations exist.
    fn record(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = MailroomResult<AuditLogEntry>> + Send;
    /// Most recent first, at most `limit` entries.
    fn list(
        &self,
        filter: AuditLogFilter,
        limit: u64,
    ) -> impl Future<Output = MailroomResult<Vec<AuditLogEntry>>> + Send;
}
