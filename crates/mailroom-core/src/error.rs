//! Error types for mailroom.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single failing input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum MailroomError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// No valid session.
    #[error("Authentication required")]
    Unauthenticated,

    /// Credential check failed. Deliberately carries no reason so that
    /// unknown users, inactive users and wrong passwords look the same.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authorization denied: {reason}")]
    Forbidden { reason: String },

    #[error("Validation error: {}", summarize(.errors))]
    Validation { errors: Vec<FieldError> },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MailroomError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        MailroomError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        MailroomError::Forbidden {
            reason: reason.into(),
        }
    }

    pub fn invalid(field: &str, message: &str) -> Self {
        MailroomError::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<validator::ValidationErrors> for MailroomError {
    fn from(errors: validator::ValidationErrors) -> Self {
        MailroomError::Validation {
            errors: crate::validation::field_errors(&errors),
        }
    }
}

pub type MailroomResult<T> = Result<T, MailroomError>;
