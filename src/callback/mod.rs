//! The callback pipeline: a fixed, ordered chain of handlers that turns a
//! redirect/popup/refresh response into validated, committed tokens.
//!
//! Each handler takes the context and either enriches it or fails; the first
//! failure aborts the remaining handlers and nothing is persisted, because
//! the commit step runs last.

pub mod classify;
pub mod commit;
pub mod keys;
pub mod state_check;
pub mod tokens;
pub mod user_data;
pub mod validate;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::http::IdpClient;
use crate::models::CallbackContext;
use crate::store::AuthStateStore;
use crate::utils;
use crate::validation::{SigningKeyService, TokenValidator};

pub use classify::FlowClassificationHandler;
pub use commit::StateCommitHandler;
pub use keys::KeyRetrievalHandler;
pub use state_check::StateVerificationHandler;
pub use tokens::TokenAcquisitionHandler;
pub use user_data::UserDataHandler;
pub use validate::TokenValidationHandler;

/// One step of the pipeline.
#[async_trait]
pub trait CallbackHandler: Send + Sync {
    /// A descriptive name for the handler (for logs/debug).
    fn name(&self) -> &'static str;

    async fn process(&self, context: CallbackContext) -> Result<CallbackContext, AuthError>;
}

/// Builds the pipeline in its fixed order. Called once at the composition
/// root; the handler set never changes afterwards.
pub fn create_callback_handlers(
    auth_state: Arc<AuthStateStore>,
    keys: Arc<SigningKeyService>,
    validator: Arc<TokenValidator>,
    idp: Arc<IdpClient>,
) -> Vec<Box<dyn CallbackHandler>> {
    vec![
        Box::new(FlowClassificationHandler),
        Box::new(StateVerificationHandler::new(auth_state.clone())),
        Box::new(KeyRetrievalHandler::new(keys)),
        Box::new(TokenAcquisitionHandler::new(idp.clone(), auth_state.clone())),
        Box::new(TokenValidationHandler::new(validator, auth_state.clone())),
        Box::new(UserDataHandler::new(idp)),
        Box::new(StateCommitHandler::new(auth_state)),
    ]
}

/// Runs callbacks through the handler chain.
pub struct CallbackService {
    handlers: Vec<Box<dyn CallbackHandler>>,
}

impl CallbackService {
    pub fn new(handlers: Vec<Box<dyn CallbackHandler>>) -> Self {
        CallbackService { handlers }
    }

    /// Whether a URL should be routed through the pipeline at all.
    pub fn is_callback(url: &str) -> bool {
        utils::url::is_callback(url)
    }

    /// Handles a redirect or popup callback URL.
    pub async fn handle_callback(
        &self,
        url: &str,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Result<CallbackContext, AuthError> {
        let params = utils::url::callback_params(url);
        let context = CallbackContext::from_url(url, params, config, all_configs);
        self.run(context).await
    }

    /// Handles a refresh-token exchange, which re-enters the same chain with
    /// a refresh-style context instead of a URL.
    pub async fn handle_refresh(
        &self,
        refresh_token: &str,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Result<CallbackContext, AuthError> {
        let context = CallbackContext::for_refresh(refresh_token, config, all_configs);
        self.run(context).await
    }

    async fn run(&self, mut context: CallbackContext) -> Result<CallbackContext, AuthError> {
        for handler in &self.handlers {
            debug!(
                "Running callback handler '{}' for config '{}'",
                handler.name(),
                context.config.config_id
            );

            context = match handler.process(context).await {
                Ok(context) => context,
                Err(e) => {
                    warn!(
                        "Callback handler '{}' failed for config: {}",
                        handler.name(),
                        e
                    );
                    return Err(e);
                }
            };
        }

        Ok(context)
    }
}
