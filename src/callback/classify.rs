use async_trait::async_trait;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::models::{CallbackContext, FlowKind};

/// Determines which protocol flow the callback belongs to, and rejects
/// provider error callbacks before any further work happens.
pub struct FlowClassificationHandler;

#[async_trait]
impl CallbackHandler for FlowClassificationHandler {
    fn name(&self) -> &'static str {
        "flow-classification"
    }

    async fn process(&self, mut context: CallbackContext) -> Result<CallbackContext, AuthError> {
        if context.refresh_token.is_some() {
            context.flow = FlowKind::RefreshToken;
            return Ok(context);
        }

        if let Some(error) = &context.params.error {
            let description = context
                .params
                .error_description
                .as_deref()
                .map(|d| format!(": {}", d))
                .unwrap_or_default();
            return Err(AuthError::InvalidGrant(format!("{}{}", error, description)));
        }

        context.flow = if context.params.code.is_some() {
            FlowKind::Code
        } else if context.params.id_token.is_some() || context.params.access_token.is_some() {
            FlowKind::Implicit
        } else {
            return Err(AuthError::InvalidGrant(
                "callback carried no recognized response parameters".to_string(),
            ));
        };

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallbackParams;
    use crate::test_support::test_config;
    use crate::utils;

    fn context_for(url: &str) -> CallbackContext {
        let config = test_config("a", "https://idp.example");
        CallbackContext::from_url(url, utils::url::callback_params(url), &config, &[config.clone()])
    }

    #[tokio::test]
    async fn test_code_callback_classified() {
        let context = context_for("https://app.example/cb?code=abc&state=s");
        let context = FlowClassificationHandler.process(context).await.unwrap();
        assert_eq!(context.flow, FlowKind::Code);
    }

    #[tokio::test]
    async fn test_implicit_callback_classified() {
        let context = context_for("https://app.example/cb#id_token=t&state=s");
        let context = FlowClassificationHandler.process(context).await.unwrap();
        assert_eq!(context.flow, FlowKind::Implicit);
    }

    #[tokio::test]
    async fn test_refresh_context_keeps_flow() {
        let config = test_config("a", "https://idp.example");
        let context = CallbackContext::for_refresh("rt", &config, &[config.clone()]);
        let context = FlowClassificationHandler.process(context).await.unwrap();
        assert_eq!(context.flow, FlowKind::RefreshToken);
    }

    #[tokio::test]
    async fn test_provider_error_rejected() {
        let context =
            context_for("https://app.example/cb?error=access_denied&error_description=nope&state=s");
        let result = FlowClassificationHandler.process(context).await;
        match result {
            Err(AuthError::InvalidGrant(message)) => {
                assert!(message.contains("access_denied"));
                assert!(message.contains("nope"));
            }
            other => panic!("Expected InvalidGrant, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_empty_params_rejected() {
        let config = test_config("a", "https://idp.example");
        let context = CallbackContext::from_url(
            "https://app.example/home",
            CallbackParams::default(),
            &config,
            &[config.clone()],
        );
        assert!(FlowClassificationHandler.process(context).await.is_err());
    }
}
