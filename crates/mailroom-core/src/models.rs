//! Domain models for mailroom.
//!
//! These are the core types shared across all crates. JSON field names
//! are camelCase to match the HTTP surface.

pub mod audit;
pub mod domain;
pub mod message;
pub mod session;
pub mod user;
