//! Opaque authentication token generation.
//!
//! Tokens are 32 bytes from a CSPRNG, hex-encoded (64 lowercase hex
//! characters). They carry no meaning and are used only as lookup keys.

use rand::rngs::OsRng;
use rand::{Rng, TryRngCore, rng};
use sha2::{Digest, Sha256};

use crate::auth::AuthError;

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 32;

/// Length of an encoded token.
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Produces unpredictable, collision-resistant tokens.
#[derive(Debug, Clone, Copy)]
pub struct TokenGenerator {
    _private: (),
}

impl TokenGenerator {
    /// Probes the operating system entropy source. Failure here is a fatal
    /// configuration problem and should stop startup; once constructed,
    /// [`generate`](Self::generate) cannot fail.
    pub fn new() -> Result<Self, AuthError> {
        let mut probe = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| AuthError::Internal(format!("entropy source unavailable: {e}")))?;
        Ok(Self { _private: () })
    }

    /// Generate a fresh token.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; TOKEN_BYTES];
        rng().fill(&mut bytes[..]);
        hex::encode(bytes)
    }
}

/// Whether `candidate` has the shape of a generated token.
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() == TOKEN_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Short, non-reversible tag for a token, safe to put in logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
