//! Mailroom Core: domain models, error taxonomy, the access policy
//! gate and repository traits shared by every other crate.

pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod validation;
