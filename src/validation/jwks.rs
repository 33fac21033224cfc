//! Per-configuration signing-key cache.
//!
//! Keys are fetched lazily from the configuration's JWKS endpoint, cached
//! with a bounded lifespan, and re-fetched once when a token header
//! references a key id the cache does not know. Caches are keyed by
//! `config_id` and never shared across configurations.

use std::sync::Arc;

use cached::{Cached, TimedCache};
use jsonwebtoken::jwk::{Jwk, JwkSet};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::http::IdpClient;

const JWKS_CACHE_SECONDS: u64 = 600;

pub struct SigningKeyService {
    idp: Arc<IdpClient>,
    cache: Mutex<TimedCache<String, JwkSet>>,
}

impl SigningKeyService {
    pub fn new(idp: Arc<IdpClient>) -> Self {
        SigningKeyService {
            idp,
            cache: Mutex::new(TimedCache::with_lifespan(JWKS_CACHE_SECONDS)),
        }
    }

    /// Returns the configuration's key set, fetching on a cache miss.
    pub async fn get(&self, config: &OpenIdConfiguration) -> Result<JwkSet, AuthError> {
        if let Some(keys) = self.cache.lock().await.cache_get(&config.config_id) {
            return Ok(keys.clone());
        }
        self.refresh(config).await
    }

    /// Unconditionally re-fetches and caches the configuration's key set.
    pub async fn refresh(&self, config: &OpenIdConfiguration) -> Result<JwkSet, AuthError> {
        debug!(
            "Refreshing signing keys for config '{}' from {}",
            config.config_id, config.endpoints.jwks_uri
        );
        let keys = self.idp.fetch_jwks(&config.endpoints.jwks_uri).await?;
        self.cache
            .lock()
            .await
            .cache_set(config.config_id.clone(), keys.clone());
        Ok(keys)
    }

    /// Resolves the key a token header references. An unknown `kid` forces
    /// one refresh before the lookup fails.
    pub async fn key_for(
        &self,
        config: &OpenIdConfiguration,
        kid: Option<&str>,
    ) -> Result<Jwk, AuthError> {
        let keys = self.get(config).await?;
        if let Some(jwk) = find_key(&keys, kid) {
            return Ok(jwk);
        }

        debug!(
            "No key matching kid {:?} cached for config '{}', refreshing",
            kid, config.config_id
        );
        let keys = self.refresh(config).await?;
        find_key(&keys, kid).ok_or_else(|| {
            AuthError::SignatureInvalid(format!(
                "no signing key matching kid {:?} after refresh",
                kid
            ))
        })
    }
}

fn find_key(keys: &JwkSet, kid: Option<&str>) -> Option<Jwk> {
    match kid {
        Some(kid) => keys.find(kid).cloned(),
        // Without a kid the set must be unambiguous.
        None if keys.keys.len() == 1 => Some(keys.keys[0].clone()),
        None => None,
    }
}
