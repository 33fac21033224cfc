use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::frame::NavigationFrame;
use crate::callback::CallbackService;
use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::events::{AuthEvent, EventBus};
use crate::login::LoginService;
use crate::models::LoginResponse;
use crate::store::AuthStateStore;

/// Renews a configuration's session without user interaction: a
/// refresh-token exchange when configured, otherwise a `prompt=none`
/// authorize round trip through a hidden frame. Either way the result
/// re-enters the callback pipeline.
///
/// At most one renewal per configuration is ever in flight; the wait on the
/// frame is bounded so an unresponsive provider becomes a failed renewal
/// instead of a hang.
pub struct SilentRenewRunner {
    frame: Arc<dyn NavigationFrame>,
    login: Arc<LoginService>,
    callback: Arc<CallbackService>,
    auth_state: Arc<AuthStateStore>,
    events: EventBus,
    renew_guards: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SilentRenewRunner {
    pub fn new(
        frame: Arc<dyn NavigationFrame>,
        login: Arc<LoginService>,
        callback: Arc<CallbackService>,
        auth_state: Arc<AuthStateStore>,
        events: EventBus,
    ) -> Self {
        SilentRenewRunner {
            frame,
            login,
            callback,
            auth_state,
            events,
            renew_guards: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_silent_renew_configured(config: &OpenIdConfiguration) -> bool {
        config.silent_renew
    }

    async fn guard_for(&self, config_id: &str) -> Arc<Mutex<()>> {
        self.renew_guards
            .lock()
            .await
            .entry(config_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Runs one renewal cycle. A trigger that arrives while a cycle is
    /// already running is a no-op resolving to the current stored state.
    pub async fn renew(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Result<LoginResponse, AuthError> {
        let config_id = &config.config_id;

        let guard = self.guard_for(config_id).await;
        let _running = match guard.try_lock() {
            Ok(lock) => lock,
            Err(_) => {
                debug!("Renewal already in flight for config '{}'", config_id);
                return Ok(self.auth_state.login_response(config).await);
            }
        };

        self.events.fire(AuthEvent::SilentRenewStarted {
            config_id: config_id.clone(),
        });

        let wait = Duration::from_secs(config.silent_renew_timeout_secs.max(1));
        match timeout(wait, self.renew_inner(config, all_configs)).await {
            Ok(Ok(())) => Ok(self.auth_state.login_response(config).await),
            Ok(Err(e)) => {
                self.events.fire(AuthEvent::SilentRenewFailed {
                    config_id: config_id.clone(),
                    message: e.to_string(),
                });
                // A rejected renewal ends the session.
                if let Err(reset_error) = self.auth_state.reset_auth_data(config_id).await {
                    warn!(
                        "Failed to reset auth data for config '{}': {}",
                        config_id, reset_error
                    );
                }
                Err(e)
            }
            Err(_) => {
                // Timeout: prior valid tokens stay untouched until expiry.
                let e = AuthError::RenewalTimeout {
                    config_id: config_id.clone(),
                };
                self.events.fire(AuthEvent::SilentRenewFailed {
                    config_id: config_id.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn renew_inner(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> Result<(), AuthError> {
        if config.use_refresh_token {
            if let Some(refresh_token) = self.auth_state.refresh_token(&config.config_id).await? {
                self.callback
                    .handle_refresh(&refresh_token, config, all_configs)
                    .await?;
                return Ok(());
            }
            debug!(
                "No refresh token stored for config '{}', falling back to frame renewal",
                config.config_id
            );
        }

        let authorize_url = self.login.compose_authorize_url(config, true).await?;
        let callback_url = self
            .frame
            .navigate(&authorize_url)
            .await
            .map_err(AuthError::transport)?;
        self.callback
            .handle_callback(&callback_url, config, all_configs)
            .await?;
        Ok(())
    }

    /// Forces a live refresh against the identity provider. Failures come
    /// back as an error-flagged response, never as an `Err`.
    pub async fn force_refresh_session(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) -> LoginResponse {
        match self.renew(config, all_configs).await {
            Ok(response) => response,
            Err(e) => LoginResponse::error(Some(&config.config_id), e.to_string()),
        }
    }
}
