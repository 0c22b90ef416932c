//! Salted password hashing with Argon2

use anyhow::Result;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use tracing::error;

/// Hash a plaintext password with a fresh random salt.
///
/// Returns the PHC string (algorithm, parameters, salt and digest), safe to
/// store as text.
pub fn hash(plaintext: &str) -> Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let password_hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

    Ok(password_hash)
}

/// Check a plaintext password against a stored digest.
///
/// The comparison is constant time; an unparsable digest never verifies.
pub fn verify(digest: &str, plaintext: &str) -> bool {
    let parsed_hash = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!("Failed to parse password hash: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed_hash)
        .is_ok()
}
