use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::models::CallbackContext;
use crate::store::AuthStateStore;

/// The all-or-nothing commit: persists validated tokens, marks the
/// configuration authenticated, and clears the one-time values so the same
/// callback can never replay. Runs last; any earlier failure leaves the
/// previous auth state fully intact.
pub struct StateCommitHandler {
    auth_state: Arc<AuthStateStore>,
}

impl StateCommitHandler {
    pub fn new(auth_state: Arc<AuthStateStore>) -> Self {
        StateCommitHandler { auth_state }
    }
}

#[async_trait]
impl CallbackHandler for StateCommitHandler {
    fn name(&self) -> &'static str {
        "state-commit"
    }

    async fn process(&self, context: CallbackContext) -> Result<CallbackContext, AuthError> {
        let config_id = &context.config.config_id;

        let tokens = context.token_response.as_ref().ok_or_else(|| {
            AuthError::storage("commit reached without an acquired token response")
        })?;
        let expires_at = context
            .expires_at
            .ok_or_else(|| AuthError::storage("commit reached without a computed expiry"))?;

        self.auth_state
            .store_token_response(config_id, tokens, expires_at)
            .await?;

        if let Some(session_state) = &context.params.session_state {
            self.auth_state
                .set_session_state(config_id, session_state)
                .await?;
        }

        if let Some(user_data) = &context.user_data {
            self.auth_state.set_user_data(config_id, user_data).await?;
        }

        self.auth_state
            .set_authenticated_and_fire_event(config_id, true)
            .await?;
        self.auth_state.clear_one_time_values(config_id).await?;

        info!("Config '{}' authenticated", config_id);
        Ok(context)
    }
}
