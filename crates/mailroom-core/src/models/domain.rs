//! Mail domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::valid_domain_name;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: Uuid,
    /// Fully-qualified domain name, unique across the store.
    pub domain: String,
    pub description: Option<String>,
    pub is_active: bool,
    /// The super admin that created the domain; kept for provenance.
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDomain {
    #[validate(custom(function = "valid_domain_name"))]
    pub domain: String,
    #[serde(default)]
    pub description: Option<String>,
}
