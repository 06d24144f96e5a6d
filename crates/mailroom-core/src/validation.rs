//! Custom field rules for `#[derive(Validate)]` input types, and the
//! mapping from `validator` reports to [`FieldError`]s.

use std::borrow::Cow;

use validator::{ValidationError, ValidationErrors};

use crate::error::FieldError;

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// A dotted hostname: at least two labels of ASCII letters, digits and
/// inner hyphens.
pub fn is_domain_name(value: &str) -> bool {
    if value.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = value.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

pub fn valid_domain_name(value: &str) -> Result<(), ValidationError> {
    if is_domain_name(value.trim()) {
        Ok(())
    } else {
        Err(rule("domain_name", "must be a valid domain name"))
    }
}

/// Required, and a single token.
pub fn valid_username(value: &str) -> Result<(), ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(rule("required", "is required"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(rule("whitespace", "must not contain whitespace"));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(rule("required", "is required"))
    } else {
        Ok(())
    }
}

/// Flatten a report into camelCase field errors, ordered by field.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let name = camel_case(&field);
            errs.iter().map(move |e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                FieldError::new(name.clone(), message)
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_names() {
        assert!(is_domain_name("a.com"));
        assert!(is_domain_name("mail-1.example.co.uk"));
        assert!(!is_domain_name("localhost"));
        assert!(!is_domain_name("-bad.com"));
        assert!(!is_domain_name("a..com"));
        assert!(!is_domain_name("under_score.com"));
    }

    #[test]
    fn usernames() {
        assert!(valid_username("u1").is_ok());
        assert_eq!(valid_username("  ").unwrap_err().code, "required");
        assert_eq!(valid_username("a b").unwrap_err().code, "whitespace");
    }

    #[test]
    fn field_names_become_camel_case() {
        assert_eq!(camel_case("temp_password"), "tempPassword");
        assert_eq!(camel_case("tempPassword"), "tempPassword");
        assert_eq!(camel_case("email"), "email");
    }
}
