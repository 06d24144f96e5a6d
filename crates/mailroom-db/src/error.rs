//! Database-specific error types and conversions.

use std::collections::HashMap;

use mailroom_core::error::MailroomError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint violated on {entity}")]
    Duplicate { entity: String },
}

impl DbError {
    /// Classify the statement errors of one response, as returned by
    /// `take_errors()`.
    ///
    /// A unique index violation anywhere in the batch wins: inside a
    /// transaction it is usually reported after the sibling statements'
    /// "failed transaction" errors. Otherwise the first error that is
    /// not such a cancellation becomes a query error.
    pub(crate) fn check_statements(
        entity: &str,
        errors: HashMap<usize, surrealdb::Error>,
    ) -> Result<(), DbError> {
        if errors.is_empty() {
            return Ok(());
        }

        let mut messages: Vec<(usize, String)> = errors
            .into_iter()
            .map(|(index, err)| (index, err.to_string()))
            .collect();
        messages.sort_by_key(|(index, _)| *index);

        if messages.iter().any(|(_, msg)| is_unique_violation(msg)) {
            return Err(DbError::Duplicate {
                entity: entity.to_string(),
            });
        }

        let detail = messages
            .iter()
            .find(|(_, msg)| !is_cancelled_statement(msg))
            .or_else(|| messages.first())
            .map(|(_, msg)| msg.clone())
            .unwrap_or_default();
        Err(DbError::Query(detail))
    }
}

fn is_cancelled_statement(msg: &str) -> bool {
    msg.contains("failed transaction")
}

fn is_unique_violation(msg: &str) -> bool {
    msg.contains("already contains")
}

impl From<DbError> for MailroomError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => MailroomError::NotFound { entity, id },
            DbError::Duplicate { entity } => MailroomError::AlreadyExists { entity },
            other => MailroomError::Database(other.to_string()),
        }
    }
}
