//! Input validation. Field rules live on the input types as
//! `#[derive(Validate)]` attributes; every failing field is reported.

use mailroom_core::error::{FieldError, MailroomError, MailroomResult};
use mailroom_core::models::domain::CreateDomain;
use mailroom_core::models::message::CreateMessage;
use mailroom_core::models::user::CreateUser;
use mailroom_core::validation::field_errors;
use validator::Validate;

/// Largest audit page a caller may request.
pub const MAX_AUDIT_LIMIT: u64 = 500;

/// Minimum password length is runtime configuration, so it cannot be a
/// derive attribute.
pub fn password_length(field: &str, value: &str, min: usize) -> Option<FieldError> {
    (value.chars().count() < min)
        .then(|| FieldError::new(field, format!("must be at least {min} characters")))
}

fn finish(mut errors: Vec<FieldError>) -> MailroomResult<()> {
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(MailroomError::Validation { errors })
}

pub fn validate_create_user(input: &CreateUser, min_password_length: usize) -> MailroomResult<()> {
    let mut errors = match input.validate() {
        Ok(()) => Vec::new(),
        Err(report) => field_errors(&report),
    };
    errors.extend(password_length(
        "tempPassword",
        &input.temp_password,
        min_password_length,
    ));
    finish(errors)
}

pub fn validate_create_domain(input: &CreateDomain) -> MailroomResult<()> {
    Ok(input.validate()?)
}

pub fn validate_message(input: &CreateMessage) -> MailroomResult<()> {
    Ok(input.validate()?)
}

pub fn validate_audit_limit(limit: u64) -> MailroomResult<()> {
    let mut errors = Vec::new();
    if !(1..=MAX_AUDIT_LIMIT).contains(&limit) {
        errors.push(FieldError::new("limit", "must be between 1 and 500"));
    }
    finish(errors)
}
