//! Authentication configuration.

/// Configuration for the authentication service.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session lifetime in seconds (default: 86_400 = 24 hours).
    /// Absolute; a session is only renewed by logging in again.
    pub session_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing
    /// and verification.
    pub pepper: Option<String>,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Minimum username length accepted at login.
    pub min_username_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: 86_400,
            pepper: None,
            min_password_length: 6,
            min_username_length: 3,
        }
    }
}
