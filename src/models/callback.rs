use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::OpenIdConfiguration;

/// Which protocol flow a callback belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowKind {
    Code,
    Implicit,
    RefreshToken,
}

/// The response parameters extracted from a callback URL (query and fragment
/// merged; the fragment wins for implicit flows).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_in: Option<String>,
    pub state: Option<String>,
    pub session_state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// True when the URL carried any recognized response parameter.
    pub fn has_response(&self) -> bool {
        self.code.is_some()
            || self.id_token.is_some()
            || self.access_token.is_some()
            || self.error.is_some()
    }
}

/// The token-endpoint response shape (RFC 6749 §5.1). For implicit flows the
/// same struct is assembled from the URL fragment instead.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    /// Any additional fields we don't explicitly model.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// The registered id_token claims we validate, plus everything else flattened.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct IdTokenClaims {
    pub iss: Option<String>,
    /// `aud` may be a single string or an array of strings.
    pub aud: Option<Value>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub sub: Option<String>,
    pub nonce: Option<String>,
    pub at_hash: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl IdTokenClaims {
    pub fn audience_contains(&self, client_id: &str) -> bool {
        match &self.aud {
            Some(Value::String(aud)) => aud == client_id,
            Some(Value::Array(auds)) => auds
                .iter()
                .any(|a| a.as_str().map(|s| s == client_id).unwrap_or(false)),
            _ => false,
        }
    }

    /// The claims as a JSON object, used as user data when no userinfo
    /// endpoint is consulted.
    pub fn to_user_data(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Ephemeral state threaded through the callback pipeline for a single
/// callback invocation. Created at pipeline entry, discarded after the
/// orchestrator consumes its result; never persisted.
#[derive(Debug, Clone)]
pub struct CallbackContext {
    pub url: Option<String>,
    pub config: OpenIdConfiguration,
    /// All known configurations, for state-based lookup during
    /// multi-config callbacks.
    pub all_configs: Vec<OpenIdConfiguration>,
    pub params: CallbackParams,
    pub flow: FlowKind,
    /// Set up-front for refresh-style invocations that carry no URL.
    pub refresh_token: Option<String>,
    pub token_response: Option<TokenResponse>,
    pub id_claims: Option<IdTokenClaims>,
    pub expires_at: Option<i64>,
    pub user_data: Option<Value>,
}

impl CallbackContext {
    /// Context for a redirect/popup callback URL.
    pub fn from_url(
        url: &str,
        params: CallbackParams,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Self {
        CallbackContext {
            url: Some(url.to_string()),
            config: config.clone(),
            all_configs: all_configs.to_vec(),
            params,
            flow: FlowKind::Code,
            refresh_token: None,
            token_response: None,
            id_claims: None,
            expires_at: None,
            user_data: None,
        }
    }

    /// Context for a refresh-token exchange, which round-trips no redirect.
    pub fn for_refresh(
        refresh_token: &str,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Self {
        CallbackContext {
            url: None,
            config: config.clone(),
            all_configs: all_configs.to_vec(),
            params: CallbackParams::default(),
            flow: FlowKind::RefreshToken,
            refresh_token: Some(refresh_token.to_string()),
            token_response: None,
            id_claims: None,
            expires_at: None,
            user_data: None,
        }
    }
}
