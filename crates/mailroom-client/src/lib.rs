//! Mailroom Client: typed access to the HTTP API.
//!
//! Reads go through a [`QueryCache`] keyed by path and query string.
//! Every successful mutation invalidates the keys it can affect before
//! returning, so a later read never serves data the caller has just
//! changed.

mod cache;
mod client;
mod error;

pub use cache::QueryCache;
pub use client::{ApiClient, AuditLogQuery};
pub use error::ClientError;
