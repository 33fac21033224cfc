//! PKCE verifier and challenge handling, S256 only.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// RFC 7636 bounds for the verifier length.
pub const MIN_VERIFIER_LEN: usize = 43;
pub const MAX_VERIFIER_LEN: usize = 128;

const VERIFIER_LEN: usize = 64;

/// Generates a fresh code verifier.
pub fn generate_verifier() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFIER_LEN)
        .map(char::from)
        .collect()
}

/// Derives the S256 challenge for a verifier.
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Re-derives the stored verifier and compares it against the challenge the
/// flow was initiated with, before the code exchange is attempted. The token
/// endpoint performs the authoritative check; this one fails fast locally.
pub fn verify_verifier(verifier: &str, challenge: &str) -> Result<(), AuthError> {
    if verifier.len() < MIN_VERIFIER_LEN || verifier.len() > MAX_VERIFIER_LEN {
        return Err(AuthError::InvalidGrant(format!(
            "code verifier length {} is outside the 43-128 range",
            verifier.len()
        )));
    }

    if derive_challenge(verifier) != challenge {
        return Err(AuthError::InvalidGrant(
            "stored code verifier does not match the initiated challenge".into(),
        ));
    }

    Ok(())
}
