//! Password hashing and verification using Argon2id.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

/// Hash verified when the username does not exist, so that path costs
/// the same as a wrong password. Any syntactically valid Argon2id PHC
/// string will do; nothing can match it.
const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$\
    c29tZXNhbHRzb21lc2FsdA$\
    Yd2I9YvN0bQ9xqk8JmC3nZlQvA3p1cFJ2Ow7U4kqX5E";

fn argon2() -> Result<Argon2<'static>, AuthError> {
    // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

fn peppered(password: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{password}"),
        None => password.to_string(),
    }
}

/// Hash a plaintext password into an Argon2id PHC string.
///
/// If `pepper` is provided it is prepended to the password; the same
/// pepper must be supplied to [`verify_password`].
pub fn hash_password(password: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let salt_bytes: [u8; 16] = rand::random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Crypto(format!("salt encode error: {e}")))?;

    let input = peppered(password, pepper);
    let hash = argon2()?
        .hash_password(input.as_bytes(), &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Returns `Ok(true)` on match, `Ok(false)` on mismatch, or
/// `Err(AuthError::Crypto)` if the stored hash is malformed.
pub fn verify_password(
    password: &str,
    hash: &str,
    pepper: Option<&str>,
) -> Result<bool, AuthError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    let input = peppered(password, pepper);
    match Argon2::default().verify_password(input.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

/// Burn one verification against [`DUMMY_HASH`]. The result is
/// discarded.
pub fn verify_dummy(password: &str, pepper: Option<&str>) {
    let _ = verify_password(password, DUMMY_HASH, pepper);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() {
        let hash = hash_password("hunter2", None).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn wrong_password_does_not_match() {
        let hash = hash_password("hunter2", None).unwrap();
        assert!(!verify_password("wrong", &hash, None).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_password("hunter2", Some("pepper!")).unwrap();
        assert!(verify_password("hunter2", &hash, Some("pepper!")).unwrap());
        // Without pepper should fail.
        assert!(!verify_password("hunter2", &hash, None).unwrap());
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same", None).unwrap();
        let b = hash_password("same", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_returns_error() {
        let result = verify_password("pw", "not-a-hash", None);
        assert!(result.is_err());
    }

    #[test]
    fn dummy_hash_is_parseable() {
        assert!(argon2::PasswordHash::new(DUMMY_HASH).is_ok());
    }
}
