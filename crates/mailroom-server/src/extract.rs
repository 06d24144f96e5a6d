//! Request extractors: JSON/query/path wrappers with JSON rejections,
//! the session cookie, and role-gated principals.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Path, Query};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, header};
use mailroom_core::error::MailroomError;
use mailroom_core::models::user::User;
use mailroom_core::policy::{self, Gate};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "mailroom_session";

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Read a single cookie value from the request headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .filter(|v| !v.is_empty())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let secure = if secure { "; Secure" } else { "" };
    HeaderValue::from_str(&format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}{secure}"
    ))
    .ok()
}

/// `Set-Cookie` value that expires the session cookie.
pub fn clear_session_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static(
            "mailroom_session=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Secure",
        )
    } else {
        HeaderValue::from_static("mailroom_session=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
    }
}

/// Caller metadata recorded on new sessions.
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let ip_address = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(Self {
            ip_address,
            user_agent,
        })
    }
}

/// Resolve the session cookie to a principal. Missing, unknown and
/// expired sessions all yield `None`.
async fn principal(parts: &Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let Some(token) = parse_cookie(&parts.headers, SESSION_COOKIE) else {
        return Ok(None);
    };
    match state.auth.resolve(&token).await {
        Ok(user) => Ok(Some(user)),
        Err(MailroomError::Unauthenticated) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn gated(parts: &Parts, state: &AppState, gate: Gate) -> Result<User, ApiError> {
    let user = principal(parts, state).await?;
    match policy::require(user.as_ref(), gate) {
        Ok(user) => Ok(user.clone()),
        Err(e) => {
            if let (MailroomError::Forbidden { .. }, Some(user)) = (&e, &user) {
                warn!(
                    user_id = %user.id,
                    role = %user.role,
                    gate = ?gate,
                    path = %parts.uri.path(),
                    "access denied"
                );
            }
            Err(e.into())
        }
    }
}

macro_rules! gated_principal {
    ($(#[$doc:meta])* $name:ident, $gate:expr) => {
        $(#[$doc])*
        pub struct $name(pub User);

        impl FromRequestParts<AppState> for $name {
            type Rejection = ApiError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                gated(parts, state, $gate).await.map(Self)
            }
        }
    };
}

gated_principal!(
    /// Any caller with a valid session.
    CurrentUser,
    Gate::Authenticated
);
gated_principal!(
    /// `admin` or `super_admin`.
    AdminUser,
    Gate::AdminOrAbove
);
gated_principal!(SuperAdminUser, Gate::SuperAdmin);
