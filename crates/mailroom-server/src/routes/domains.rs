use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use mailroom_core::models::domain::{CreateDomain, Domain};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, SuperAdminUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatusRequest {
    pub is_active: bool,
}

pub async fn list(
    State(state): State<AppState>,
    SuperAdminUser(actor): SuperAdminUser,
) -> Result<Json<Vec<Domain>>, ApiError> {
    Ok(Json(state.domains.list(Some(&actor)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    SuperAdminUser(actor): SuperAdminUser,
    ApiJson(input): ApiJson<CreateDomain>,
) -> Result<(StatusCode, Json<Domain>), ApiError> {
    let domain = state.domains.create(Some(&actor), input).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

pub async fn set_active(
    State(state): State<AppState>,
    SuperAdminUser(actor): SuperAdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<DomainStatusRequest>,
) -> Result<Json<Domain>, ApiError> {
    let domain = state
        .domains
        .set_active(Some(&actor), id, body.is_active)
        .await?;
    Ok(Json(domain))
}
