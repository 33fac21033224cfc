use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use super::Store;
use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::events::{AuthEvent, EventBus};
use crate::models::{LoginResponse, TokenResponse};

const ACCESS_TOKEN: &str = "access_token";
const ID_TOKEN: &str = "id_token";
const REFRESH_TOKEN: &str = "refresh_token";
const EXPIRES_AT: &str = "expires_at";
const IS_AUTHENTICATED: &str = "is_authenticated";
const AUTH_STATE_CONTROL: &str = "auth_state_control";
const AUTH_NONCE: &str = "auth_nonce";
const CODE_VERIFIER: &str = "code_verifier";
const CODE_CHALLENGE: &str = "code_challenge";
const SESSION_STATE: &str = "session_state";
const USER_DATA: &str = "user_data";

/// Typed facade over the pluggable `Store`, holding one `AuthState` per
/// configuration: tokens, one-time protocol values, the authenticated flag
/// and expiry bookkeeping.
///
/// Written only by the callback pipeline's commit step and the session
/// liveness subsystem; read everywhere else.
pub struct AuthStateStore {
    store: Arc<dyn Store>,
    events: EventBus,
}

impl AuthStateStore {
    pub fn new(store: Arc<dyn Store>, events: EventBus) -> Self {
        AuthStateStore { store, events }
    }

    async fn read(&self, item: &str, config_id: &str) -> Result<Option<String>, AuthError> {
        self.store
            .read(item, config_id)
            .await
            .map_err(AuthError::storage)
    }

    async fn write(&self, item: &str, config_id: &str, value: &str) -> Result<(), AuthError> {
        self.store
            .write(item, config_id, value)
            .await
            .map_err(AuthError::storage)
    }

    async fn remove(&self, item: &str, config_id: &str) -> Result<(), AuthError> {
        self.store
            .remove(item, config_id)
            .await
            .map_err(AuthError::storage)
    }

    // -- Tokens

    pub async fn access_token(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(ACCESS_TOKEN, config_id).await
    }

    pub async fn id_token(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(ID_TOKEN, config_id).await
    }

    pub async fn refresh_token(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(REFRESH_TOKEN, config_id).await
    }

    pub async fn expires_at(&self, config_id: &str) -> Result<Option<i64>, AuthError> {
        Ok(self
            .read(EXPIRES_AT, config_id)
            .await?
            .and_then(|v| v.parse::<i64>().ok()))
    }

    /// Persists a validated token response plus its computed expiry.
    pub async fn store_token_response(
        &self,
        config_id: &str,
        tokens: &TokenResponse,
        expires_at: i64,
    ) -> Result<(), AuthError> {
        if let Some(access_token) = &tokens.access_token {
            self.write(ACCESS_TOKEN, config_id, access_token).await?;
        }
        if let Some(id_token) = &tokens.id_token {
            self.write(ID_TOKEN, config_id, id_token).await?;
        }
        if let Some(refresh_token) = &tokens.refresh_token {
            self.write(REFRESH_TOKEN, config_id, refresh_token).await?;
        }
        self.write(EXPIRES_AT, config_id, &expires_at.to_string())
            .await
    }

    // -- One-time protocol values

    pub async fn auth_state_control(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(AUTH_STATE_CONTROL, config_id).await
    }

    pub async fn set_auth_state_control(
        &self,
        config_id: &str,
        state: &str,
    ) -> Result<(), AuthError> {
        self.write(AUTH_STATE_CONTROL, config_id, state).await
    }

    pub async fn auth_nonce(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(AUTH_NONCE, config_id).await
    }

    pub async fn set_auth_nonce(&self, config_id: &str, nonce: &str) -> Result<(), AuthError> {
        self.write(AUTH_NONCE, config_id, nonce).await
    }

    pub async fn code_verifier(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(CODE_VERIFIER, config_id).await
    }

    pub async fn set_code_verifier(
        &self,
        config_id: &str,
        verifier: &str,
    ) -> Result<(), AuthError> {
        self.write(CODE_VERIFIER, config_id, verifier).await
    }

    pub async fn code_challenge(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(CODE_CHALLENGE, config_id).await
    }

    pub async fn set_code_challenge(
        &self,
        config_id: &str,
        challenge: &str,
    ) -> Result<(), AuthError> {
        self.write(CODE_CHALLENGE, config_id, challenge).await
    }

    /// Clears the replay-protection values. Called exactly once per
    /// successful commit; a replayed callback then fails the state check
    /// instead of re-authenticating.
    pub async fn clear_one_time_values(&self, config_id: &str) -> Result<(), AuthError> {
        self.remove(AUTH_STATE_CONTROL, config_id).await?;
        self.remove(AUTH_NONCE, config_id).await?;
        self.remove(CODE_VERIFIER, config_id).await?;
        self.remove(CODE_CHALLENGE, config_id).await
    }

    // -- Session state

    pub async fn session_state(&self, config_id: &str) -> Result<Option<String>, AuthError> {
        self.read(SESSION_STATE, config_id).await
    }

    pub async fn set_session_state(
        &self,
        config_id: &str,
        session_state: &str,
    ) -> Result<(), AuthError> {
        self.write(SESSION_STATE, config_id, session_state).await
    }

    // -- User data

    pub async fn user_data(&self, config_id: &str) -> Result<Option<Value>, AuthError> {
        Ok(self
            .read(USER_DATA, config_id)
            .await?
            .and_then(|raw| serde_json::from_str(&raw).ok()))
    }

    pub async fn set_user_data(&self, config_id: &str, user_data: &Value) -> Result<(), AuthError> {
        let raw = serde_json::to_string(user_data)
            .map_err(|e| AuthError::storage(format!("failed to serialize user data: {}", e)))?;
        self.write(USER_DATA, config_id, &raw).await?;
        self.events.fire(AuthEvent::UserDataChanged {
            config_id: config_id.to_string(),
        });
        Ok(())
    }

    /// Fires `UserDataChanged` when user data is already in the store, so
    /// subscribers see it on non-callback navigations too.
    pub async fn publish_user_data_if_exists(&self, config_id: &str) -> Result<(), AuthError> {
        if self.user_data(config_id).await?.is_some() {
            self.events.fire(AuthEvent::UserDataChanged {
                config_id: config_id.to_string(),
            });
        }
        Ok(())
    }

    // -- Authenticated flag

    pub async fn is_authenticated(&self, config_id: &str) -> Result<bool, AuthError> {
        Ok(self
            .read(IS_AUTHENTICATED, config_id)
            .await?
            .map(|v| v == "true")
            .unwrap_or(false))
    }

    pub async fn set_authenticated_and_fire_event(
        &self,
        config_id: &str,
        is_authenticated: bool,
    ) -> Result<(), AuthError> {
        self.write(
            IS_AUTHENTICATED,
            config_id,
            if is_authenticated { "true" } else { "false" },
        )
        .await?;
        self.events.fire(AuthEvent::AuthenticatedChanged {
            config_id: config_id.to_string(),
            is_authenticated,
        });
        Ok(())
    }

    /// True when the stored tokens are present, marked authenticated, and
    /// not past their expiry.
    pub async fn are_auth_storage_tokens_valid(&self, config: &OpenIdConfiguration) -> bool {
        let config_id = &config.config_id;

        let authenticated = self.is_authenticated(config_id).await.unwrap_or(false);
        if !authenticated {
            return false;
        }

        let has_tokens = matches!(self.id_token(config_id).await, Ok(Some(_)))
            || matches!(self.access_token(config_id).await, Ok(Some(_)));
        if !has_tokens {
            return false;
        }

        match self.expires_at(config_id).await {
            Ok(Some(expires_at)) => {
                let valid = expires_at > Utc::now().timestamp();
                if !valid {
                    debug!("Tokens for config '{}' have expired", config_id);
                }
                valid
            }
            _ => false,
        }
    }

    /// Seconds until the stored tokens expire; negative when already expired.
    pub async fn seconds_until_expiry(&self, config_id: &str) -> Option<i64> {
        let expires_at = self.expires_at(config_id).await.ok().flatten()?;
        Some(expires_at - Utc::now().timestamp())
    }

    /// Destroys the configuration's auth state, e.g. on logoff or failed
    /// renewal, and fires the authenticated-state-changed event.
    pub async fn reset_auth_data(&self, config_id: &str) -> Result<(), AuthError> {
        self.store
            .clear(config_id)
            .await
            .map_err(AuthError::storage)?;
        self.events.fire(AuthEvent::AuthenticatedChanged {
            config_id: config_id.to_string(),
            is_authenticated: false,
        });
        Ok(())
    }

    /// Builds the public result for a configuration from what the store
    /// currently holds.
    pub async fn login_response(&self, config: &OpenIdConfiguration) -> LoginResponse {
        let config_id = &config.config_id;

        LoginResponse {
            is_authenticated: self.are_auth_storage_tokens_valid(config).await,
            user_data: self.user_data(config_id).await.ok().flatten(),
            id_token: self.id_token(config_id).await.ok().flatten(),
            access_token: self.access_token(config_id).await.ok().flatten(),
            config_id: Some(config_id.clone()),
            error_message: None,
        }
    }
}
