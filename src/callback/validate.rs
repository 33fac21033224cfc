use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::models::{CallbackContext, FlowKind};
use crate::store::AuthStateStore;
use crate::validation::TokenValidator;

// Used when neither the response nor the id_token carries an expiry.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Delegates to the validation engine and computes the expiry timestamp the
/// commit step will persist.
pub struct TokenValidationHandler {
    validator: Arc<TokenValidator>,
    auth_state: Arc<AuthStateStore>,
}

impl TokenValidationHandler {
    pub fn new(validator: Arc<TokenValidator>, auth_state: Arc<AuthStateStore>) -> Self {
        TokenValidationHandler {
            validator,
            auth_state,
        }
    }
}

#[async_trait]
impl CallbackHandler for TokenValidationHandler {
    fn name(&self) -> &'static str {
        "token-validation"
    }

    async fn process(&self, mut context: CallbackContext) -> Result<CallbackContext, AuthError> {
        let tokens = context.token_response.clone().ok_or_else(|| {
            AuthError::InvalidGrant("no tokens were acquired for validation".to_string())
        })?;

        if let Some(id_token) = tokens.id_token.as_deref() {
            // A refresh exchange round-trips no authorize redirect, so there
            // is no fresh nonce to hold it against.
            let stored_nonce = match context.flow {
                FlowKind::RefreshToken => None,
                _ => self
                    .auth_state
                    .auth_nonce(&context.config.config_id)
                    .await?,
            };

            let claims = self
                .validator
                .validate_id_token(
                    &context.config,
                    id_token,
                    tokens.access_token.as_deref(),
                    stored_nonce.as_deref(),
                )
                .await?;
            context.id_claims = Some(claims);
        } else if tokens.access_token.is_none() {
            return Err(AuthError::InvalidGrant(
                "response contained neither id_token nor access_token".to_string(),
            ));
        }

        let now = Utc::now().timestamp();
        context.expires_at = Some(match tokens.expires_in {
            Some(expires_in) => now + expires_in,
            None => match context.id_claims.as_ref().and_then(|c| c.exp) {
                Some(exp) => exp,
                None => {
                    debug!(
                        "No expiry in response for config '{}', assuming {}s",
                        context.config.config_id, DEFAULT_TOKEN_LIFETIME_SECS
                    );
                    now + DEFAULT_TOKEN_LIFETIME_SECS
                }
            },
        });

        Ok(context)
    }
}
