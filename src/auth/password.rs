use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::warn;

use crate::error::{ChatError, ChatResult};

/// Argon2id PHC string for `password`, salted fresh each call.
pub fn hash(password: &str) -> ChatResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ChatError::Credentials(e.to_string()))
}

/// False for a wrong password and for anything that isn't a PHC hash.
pub fn verify(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            warn!("stored credential is not a password hash, refusing login");
            false
        }
    }
}
