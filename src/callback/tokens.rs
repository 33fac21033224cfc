use std::sync::Arc;

use async_trait::async_trait;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::http::IdpClient;
use crate::models::{CallbackContext, FlowKind, TokenResponse};
use crate::store::AuthStateStore;
use crate::validation::pkce;

/// Acquires tokens for the classified flow: code exchange, fragment parse,
/// or refresh-token exchange.
pub struct TokenAcquisitionHandler {
    idp: Arc<IdpClient>,
    auth_state: Arc<AuthStateStore>,
}

impl TokenAcquisitionHandler {
    pub fn new(idp: Arc<IdpClient>, auth_state: Arc<AuthStateStore>) -> Self {
        TokenAcquisitionHandler { idp, auth_state }
    }

    async fn acquire_with_code(&self, context: &CallbackContext) -> Result<TokenResponse, AuthError> {
        let config_id = &context.config.config_id;
        let code = context
            .params
            .code
            .as_deref()
            .ok_or_else(|| AuthError::InvalidGrant("callback carried no code".to_string()))?;

        let verifier = if context.config.use_pkce {
            let verifier = self.auth_state.code_verifier(config_id).await?.ok_or_else(|| {
                AuthError::InvalidGrant("no code verifier stored for this flow".to_string())
            })?;

            // Fail fast locally before burning a token-endpoint round trip;
            // the endpoint still performs the authoritative check.
            if let Some(challenge) = self.auth_state.code_challenge(config_id).await? {
                pkce::verify_verifier(&verifier, &challenge)?;
            }

            Some(verifier)
        } else {
            None
        };

        self.idp
            .request_tokens_with_code(&context.config, code, verifier.as_deref())
            .await
    }

    fn acquire_from_fragment(&self, context: &CallbackContext) -> TokenResponse {
        TokenResponse {
            access_token: context.params.access_token.clone(),
            id_token: context.params.id_token.clone(),
            expires_in: context
                .params
                .expires_in
                .as_deref()
                .and_then(|v| v.parse::<i64>().ok()),
            ..Default::default()
        }
    }

    async fn acquire_with_refresh(
        &self,
        context: &CallbackContext,
    ) -> Result<TokenResponse, AuthError> {
        let refresh_token = match &context.refresh_token {
            Some(refresh_token) => refresh_token.clone(),
            None => self
                .auth_state
                .refresh_token(&context.config.config_id)
                .await?
                .ok_or_else(|| {
                    AuthError::InvalidGrant("no refresh token available".to_string())
                })?,
        };

        self.idp
            .request_tokens_with_refresh(&context.config, &refresh_token)
            .await
    }
}

#[async_trait]
impl CallbackHandler for TokenAcquisitionHandler {
    fn name(&self) -> &'static str {
        "token-acquisition"
    }

    async fn process(&self, mut context: CallbackContext) -> Result<CallbackContext, AuthError> {
        let tokens = match context.flow {
            FlowKind::Code => self.acquire_with_code(&context).await?,
            FlowKind::Implicit => self.acquire_from_fragment(&context),
            FlowKind::RefreshToken => self.acquire_with_refresh(&context).await?,
        };

        context.token_response = Some(tokens);
        Ok(context)
    }
}
