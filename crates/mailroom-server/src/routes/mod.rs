//! HTTP routes. Everything is mounted under `/api`.

mod audit;
mod auth;
mod domains;
mod mail;
mod users;

use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/user", get(users::current))
        .route("/users", get(users::list).post(users::create))
        .route("/users/stats", get(users::stats))
        .route("/users/{id}", patch(users::update))
        .route("/emails", get(mail::list).post(mail::send))
        .route("/emails/{id}/status", patch(mail::set_status))
        .route("/emails/{id}/folder", patch(mail::move_to_folder))
        .route("/domains", get(domains::list).post(domains::create))
        .route("/domains/{id}/status", patch(domains::set_active))
        .route("/audit-logs", get(audit::list))
        .route("/health", get(health));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}
