use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use mailroom_core::models::message::{CreateMessage, Folder, Message, MessageStatus};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, CurrentUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FolderQuery {
    pub folder: Option<Folder>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub folder: Folder,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiQuery(query): ApiQuery<FolderQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(state.mail.list(Some(&user), query.folder).await?))
}

pub async fn send(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(input): ApiJson<CreateMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state.mail.send(Some(&user), input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn set_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(status): ApiJson<MessageStatus>,
) -> Result<Json<Message>, ApiError> {
    Ok(Json(state.mail.set_status(Some(&user), id, status).await?))
}

pub async fn move_to_folder(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<MoveRequest>,
) -> Result<Json<Message>, ApiError> {
    let message = state.mail.move_to_folder(Some(&user), id, body.folder).await?;
    Ok(Json(message))
}
