use std::sync::Arc;

use async_trait::async_trait;

use super::CallbackHandler;
use crate::error::AuthError;
use crate::http::IdpClient;
use crate::models::CallbackContext;

/// Resolves the session's user data: the userinfo endpoint when configured,
/// the validated id_token claims otherwise.
pub struct UserDataHandler {
    idp: Arc<IdpClient>,
}

impl UserDataHandler {
    pub fn new(idp: Arc<IdpClient>) -> Self {
        UserDataHandler { idp }
    }
}

#[async_trait]
impl CallbackHandler for UserDataHandler {
    fn name(&self) -> &'static str {
        "user-data"
    }

    async fn process(&self, mut context: CallbackContext) -> Result<CallbackContext, AuthError> {
        let access_token = context
            .token_response
            .as_ref()
            .and_then(|t| t.access_token.clone());

        if context.config.auto_user_info {
            if let (Some(userinfo_endpoint), Some(access_token)) = (
                context.config.endpoints.userinfo_endpoint.clone(),
                access_token,
            ) {
                let user_data = self
                    .idp
                    .fetch_user_info(&userinfo_endpoint, &access_token)
                    .await?;

                // The userinfo response must describe the same subject the
                // id_token was issued for.
                if let Some(claims) = &context.id_claims {
                    let userinfo_sub = user_data.get("sub").and_then(|v| v.as_str());
                    if claims.sub.as_deref() != userinfo_sub {
                        return Err(AuthError::claim(
                            "sub",
                            "userinfo sub does not match the id_token sub",
                        ));
                    }
                }

                context.user_data = Some(user_data);
            }
        }

        if context.user_data.is_none() {
            context.user_data = context.id_claims.as_ref().map(|c| c.to_user_data());
        }

        Ok(context)
    }
}
