// Password hashing and upstream-identity helpers.
//
// Session management lives in the layer in front of this service; requests
// arrive with the already-authenticated user id in a trusted header.

use argon2::{
    Argon2,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use axum::http::HeaderMap;

use crate::error::AppError;

pub const ACTOR_HEADER: &str = "x-user-id";

pub fn generate_password_hash(password: &str) -> Result<String, PasswordHashError> {
    let mut rng = OsRng;
    let salt = SaltString::generate(&mut rng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Ok(false) on a plain mismatch; Err only when the stored hash itself cannot
/// be interpreted.
pub fn verify_password(stored_hash: &str, password: &str) -> Result<bool, PasswordHashError> {
    let parsed_hash = PasswordHash::new(stored_hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(PasswordHashError::Password) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Actor identity supplied by the upstream session layer.
pub fn require_actor(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| AppError::unauthorized("authentication required"))
}
