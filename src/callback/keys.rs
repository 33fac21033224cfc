use std::sync::Arc;

use async_trait::async_trait;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::models::CallbackContext;
use crate::validation::SigningKeyService;

/// Ensures the provider's signing keys are loaded before tokens arrive, so
/// the validation step never stalls on a cold cache.
pub struct KeyRetrievalHandler {
    keys: Arc<SigningKeyService>,
}

impl KeyRetrievalHandler {
    pub fn new(keys: Arc<SigningKeyService>) -> Self {
        KeyRetrievalHandler { keys }
    }
}

#[async_trait]
impl CallbackHandler for KeyRetrievalHandler {
    fn name(&self) -> &'static str {
        "key-retrieval"
    }

    async fn process(&self, context: CallbackContext) -> Result<CallbackContext, AuthError> {
        self.keys.get(&context.config).await?;
        Ok(context)
    }
}
