use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use mailroom_auth::LoginInput;
use mailroom_core::error::MailroomError;
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::{
    ApiJson, ClientMeta, SESSION_COOKIE, clear_session_cookie, parse_cookie, session_cookie,
};
use crate::state::AppState;

/// Missing fields deserialize as empty strings and fail validation
/// with field detail instead of a body rejection.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Response, ApiError> {
    let output = state
        .auth
        .login(LoginInput {
            username: body.username,
            password: body.password,
            ip_address: meta.ip_address,
            user_agent: meta.user_agent,
        })
        .await?;

    let cookie = session_cookie(
        &output.session_token,
        state.cookie.max_age_secs,
        state.cookie.secure,
    )
    .ok_or_else(|| MailroomError::Internal("session token is not a valid header value".into()))?;

    let mut response = Json(output.user).into_response();
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// Succeeds whether or not a session was present.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, ApiError> {
    if let Some(token) = parse_cookie(&headers, SESSION_COOKIE) {
        state.auth.logout(&token).await?;
    }

    let mut response = Json(serde_json::json!({ "message": "Logged out" })).into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, clear_session_cookie(state.cookie.secure));
    Ok(response)
}
