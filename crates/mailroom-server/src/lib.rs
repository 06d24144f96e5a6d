//! Mailroom Server: axum HTTP surface, session-cookie extractors and
//! background housekeeping.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;
mod sweeper;

pub use config::{ConfigError, ServerConfig};
pub use routes::router;
pub use state::AppState;
pub use sweeper::spawn_session_sweeper;
