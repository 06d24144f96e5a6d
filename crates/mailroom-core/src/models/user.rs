//! User (principal) domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::valid_username;

/// Privilege level of a principal.
///
/// Variants are declared in ascending order of privilege so that the
/// derived `Ord` gives `SuperAdmin > Admin > Client`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(Role::Client),
            "admin" => Ok(Role::Admin),
            "super_admin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An account that can authenticate. The credential hash is never
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Weak association with a [`Domain`](super::domain::Domain).
    pub domain_id: Option<Uuid>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Fields accepted when a super admin creates an account.
///
/// The temporary password's minimum length is configurable and checked
/// by the handler.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[validate(custom(function = "valid_username"))]
    pub username: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub domain_id: Option<Uuid>,
    /// Raw temporary password (hashed with Argon2id before storage).
    pub temp_password: String,
}

/// Fully-resolved insert. The plaintext password never gets this far:
/// only its Argon2id PHC string is carried.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub domain_id: Option<Uuid>,
}

/// Partial update of an account. `None` leaves the field unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.role.is_none()
            && self.is_active.is_none()
            && self.last_login_at.is_none()
    }
}

/// Filters for listing accounts. When both are supplied the result is
/// the intersection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Case-sensitive substring matched against first name, last name
    /// and email.
    pub search: Option<String>,
}

/// Aggregate account counts for the admin dashboard.
///
/// `admins` counts only `admin`; super admins are reported separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: u64,
    pub super_admins: u64,
    pub admins: u64,
    pub clients: u64,
    pub active_today: u64,
}
