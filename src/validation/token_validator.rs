//! Signature and claim validation for id_tokens.
//!
//! Checks are short-circuiting and each failure names the specific check
//! that rejected the token: signature first, then nonce, then the
//! registered claims in a fixed order.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::debug;

use super::SigningKeyService;
use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::models::IdTokenClaims;

/// Anti-CSRF check: the returned `state` must byte-equal the stored control
/// value.
pub fn validate_state(returned: Option<&str>, stored: Option<&str>) -> Result<(), AuthError> {
    match (returned, stored) {
        (Some(returned), Some(stored)) if returned == stored => Ok(()),
        (returned, _) => Err(AuthError::StateMismatch {
            returned: returned.unwrap_or_default().to_string(),
        }),
    }
}

pub struct TokenValidator {
    keys: Arc<SigningKeyService>,
}

impl TokenValidator {
    pub fn new(keys: Arc<SigningKeyService>) -> Self {
        TokenValidator { keys }
    }

    /// Verifies the id_token signature against the configuration's signing
    /// keys, then the nonce, then the registered claims. Returns the decoded
    /// claims on success.
    pub async fn validate_id_token(
        &self,
        config: &OpenIdConfiguration,
        id_token: &str,
        access_token: Option<&str>,
        expected_nonce: Option<&str>,
    ) -> Result<IdTokenClaims, AuthError> {
        debug!("Validating id_token for config '{}'", config.config_id);

        let header = decode_header(id_token)
            .map_err(|e| AuthError::SignatureInvalid(format!("failed to decode header: {}", e)))?;

        let alg = match header.alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::HS256
            | Algorithm::HS512 => header.alg,
            other => {
                return Err(AuthError::SignatureInvalid(format!(
                    "unsupported algorithm: {:?}",
                    other
                )))
            }
        };

        let jwk = self.keys.key_for(config, header.kid.as_deref()).await?;
        let decoding_key = DecodingKey::from_jwk(&jwk).map_err(|_| {
            AuthError::SignatureInvalid("failed to create decoding key from JWK".to_string())
        })?;

        // Claim checks run below with named failures, so the decoder only
        // verifies the signature here.
        let mut validation = Validation::new(alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims = Default::default();

        let decoded = decode::<IdTokenClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| AuthError::SignatureInvalid(format!("failed to decode token: {}", e)))?;
        let claims = decoded.claims;

        if let Some(expected) = expected_nonce {
            match &claims.nonce {
                Some(nonce) if nonce == expected => {}
                _ => return Err(AuthError::NonceMismatch),
            }
        }

        validate_claims(config, &claims, access_token, alg)?;

        Ok(claims)
    }
}

fn validate_claims(
    config: &OpenIdConfiguration,
    claims: &IdTokenClaims,
    access_token: Option<&str>,
    alg: Algorithm,
) -> Result<(), AuthError> {
    match &claims.iss {
        Some(iss) if *iss == config.authority => {}
        other => {
            return Err(AuthError::claim(
                "iss",
                format!(
                    "expected '{}', got {:?}",
                    config.authority,
                    other.as_deref().unwrap_or("<missing>")
                ),
            ))
        }
    }

    if !claims.audience_contains(&config.client_id) {
        return Err(AuthError::claim(
            "aud",
            format!("does not contain client id '{}'", config.client_id),
        ));
    }

    let now = Utc::now().timestamp();

    match claims.exp {
        Some(exp) if exp > now => {}
        Some(exp) => {
            return Err(AuthError::claim(
                "exp",
                format!("token expired {} seconds ago", now - exp),
            ))
        }
        None => return Err(AuthError::claim("exp", "missing")),
    }

    match claims.iat {
        Some(iat) if (now - iat).abs() <= config.max_id_token_iat_offset_secs => {}
        Some(iat) => {
            return Err(AuthError::claim(
                "iat",
                format!(
                    "issued {} seconds away from now, allowed offset is {}",
                    (now - iat).abs(),
                    config.max_id_token_iat_offset_secs
                ),
            ))
        }
        None => return Err(AuthError::claim("iat", "missing")),
    }

    if let (Some(at_hash), Some(access_token)) = (&claims.at_hash, access_token) {
        let expected = compute_at_hash(alg, access_token)?;
        if *at_hash != expected {
            return Err(AuthError::claim(
                "at_hash",
                "does not match the accompanying access token",
            ));
        }
    }

    Ok(())
}

/// The `at_hash` value: base64url of the left half of the access token
/// hashed with the id_token's signature hash function.
fn compute_at_hash(alg: Algorithm, access_token: &str) -> Result<String, AuthError> {
    let digest: Vec<u8> = match alg {
        Algorithm::RS256 | Algorithm::ES256 | Algorithm::HS256 => {
            Sha256::digest(access_token.as_bytes()).to_vec()
        }
        Algorithm::RS384 | Algorithm::ES384 => Sha384::digest(access_token.as_bytes()).to_vec(),
        Algorithm::RS512 | Algorithm::HS512 => Sha512::digest(access_token.as_bytes()).to_vec(),
        other => {
            return Err(AuthError::SignatureInvalid(format!(
                "unsupported algorithm for at_hash: {:?}",
                other
            )))
        }
    };

    Ok(URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2]))
}
