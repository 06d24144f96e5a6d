use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use mailroom_core::models::user::{CreateUser, UpdateUser, User, UserFilter, UserStats};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiPath, ApiQuery, CurrentUser, SuperAdminUser};
use crate::state::AppState;

pub async fn current(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

pub async fn list(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = state.users.list_users(Some(&actor), filter).await?;
    Ok(Json(users))
}

pub async fn stats(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
) -> Result<Json<UserStats>, ApiError> {
    Ok(Json(state.users.stats(Some(&actor)).await?))
}

pub async fn create(
    State(state): State<AppState>,
    SuperAdminUser(actor): SuperAdminUser,
    ApiJson(input): ApiJson<CreateUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.users.create_user(Some(&actor), input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(patch): ApiJson<UpdateUser>,
) -> Result<Json<User>, ApiError> {
    let user = state.users.update_user(Some(&actor), id, patch).await?;
    Ok(Json(user))
}
