//! Mailroom Admin: resource handlers.
//!
//! Every operation takes the acting principal, runs it through the
//! access policy gate, validates its input, and performs the store
//! write. Privileged writes carry an [`AuditStamp`] so the store can
//! append the audit entry atomically with the change.
//!
//! [`AuditStamp`]: mailroom_core::models::audit::AuditStamp

pub mod audit;
pub mod domains;
pub mod mail;
pub mod users;
pub mod validation;

pub use audit::AuditService;
pub use domains::DomainService;
pub use mail::MailService;
pub use users::UserService;
