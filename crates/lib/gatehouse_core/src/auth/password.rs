//! bcrypt helpers for user-file passwords.

use bcrypt::BcryptError;

use super::AuthError;

/// Work factor for newly created hashes.
pub const BCRYPT_COST: u32 = 10;

fn bcrypt_failure(op: &str, e: BcryptError) -> AuthError {
    AuthError::Internal(format!("bcrypt {op}: {e}"))
}

/// Hash for the `password` field of a user entry.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    bcrypt::hash(password, BCRYPT_COST).map_err(|e| bcrypt_failure("hash", e))
}

/// Whether `password` matches `hash`. A malformed hash is an error, not a
/// mismatch.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(password, hash).map_err(|e| bcrypt_failure("verify", e))
}
