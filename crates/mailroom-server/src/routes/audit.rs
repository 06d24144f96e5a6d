use axum::Json;
use axum::extract::State;
use mailroom_core::models::audit::{AuditLogEntry, AuditLogFilter};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub limit: Option<u64>,
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
    pub target_user_id: Option<Uuid>,
}

/// Most recent first.
pub async fn list(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiQuery(query): ApiQuery<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    let filter = AuditLogFilter {
        actor_id: query.actor_id,
        target_user_id: query.target_user_id,
        action: query.action.filter(|a| !a.is_empty()),
    };
    let entries = state.audit.list(Some(&actor), filter, query.limit).await?;
    Ok(Json(entries))
}
