use std::sync::Arc;

use async_trait::async_trait;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::models::{CallbackContext, FlowKind};
use crate::store::AuthStateStore;
use crate::validation::validate_state;

/// Compares the URL's `state` against the stored control value. A refresh
/// exchange round-trips no redirect, so there is nothing to compare there.
pub struct StateVerificationHandler {
    auth_state: Arc<AuthStateStore>,
}

impl StateVerificationHandler {
    pub fn new(auth_state: Arc<AuthStateStore>) -> Self {
        StateVerificationHandler { auth_state }
    }
}

#[async_trait]
impl CallbackHandler for StateVerificationHandler {
    fn name(&self) -> &'static str {
        "state-verification"
    }

    async fn process(&self, context: CallbackContext) -> Result<CallbackContext, AuthError> {
        if context.flow == FlowKind::RefreshToken {
            return Ok(context);
        }

        let stored = self
            .auth_state
            .auth_state_control(&context.config.config_id)
            .await?;
        validate_state(context.params.state.as_deref(), stored.as_deref())?;

        Ok(context)
    }
}
