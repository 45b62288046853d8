//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings. Verification accepts any PHC string
//! produced by Argon2 or scrypt, so records hashed by older deployments keep
//! working.

use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use scrypt::Scrypt;
use std::sync::OnceLock;

/// Hash a plaintext password with a fresh random salt.
///
/// # Errors
/// Returns an error if the hasher rejects the input.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

/// Check `plain` against a stored PHC string in constant time.
///
/// A stored value that is not a PHC string never matches.
#[must_use]
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    let verifiers: [&dyn PasswordVerifier; 2] = [&Argon2::default(), &Scrypt];
    parsed.verify_password(&verifiers, plain).is_ok()
}

/// Burn the same work as a real verification when the email is unknown, so
/// response time does not tell whether an account exists.
pub fn verify_dummy(plain: &str) {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();

    if let Some(hash) = DUMMY.get_or_init(|| hash_password("userauth-dummy-password").ok()) {
        let _ = verify_password(plain, hash);
    }
}
