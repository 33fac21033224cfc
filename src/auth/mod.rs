//! The flow orchestrator: decides whether a navigation is a protocol
//! callback, drives the callback pipeline, evaluates stored tokens, and
//! starts the session liveness subsystem for authenticated configurations.
//!
//! Every entry point resolves to a well-formed `LoginResponse`; failures
//! surface as `is_authenticated: false` plus an error message, never as a
//! panic or an `Err` across the public surface.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::callback::CallbackService;
use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::events::{AuthEvent, EventBus};
use crate::login::PopupSurface;
use crate::models::LoginResponse;
use crate::session::{SessionLiveness, SilentRenewRunner};
use crate::store::AuthStateStore;
use crate::utils;

pub struct CheckAuthService {
    auth_state: Arc<AuthStateStore>,
    callback: Arc<CallbackService>,
    session: Arc<SessionLiveness>,
    renew: Arc<SilentRenewRunner>,
    popup: Arc<dyn PopupSurface>,
    events: EventBus,
}

impl CheckAuthService {
    pub fn new(
        auth_state: Arc<AuthStateStore>,
        callback: Arc<CallbackService>,
        session: Arc<SessionLiveness>,
        renew: Arc<SilentRenewRunner>,
        popup: Arc<dyn PopupSurface>,
        events: EventBus,
    ) -> Self {
        CheckAuthService {
            auth_state,
            callback,
            session,
            renew,
            popup,
            events,
        }
    }

    /// Checks authentication for one configuration. When the URL carries a
    /// `state` parameter it must match the configuration's stored control
    /// value; a foreign state resolves to a configuration-mismatch result.
    pub async fn check_auth(
        &self,
        config: Option<&OpenIdConfiguration>,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> LoginResponse {
        self.events.fire(AuthEvent::CheckingAuth {
            config_id: config.map(|c| c.config_id.clone()),
        });

        if let Some(state) = url.and_then(utils::url::get_state_param) {
            let candidates: Vec<OpenIdConfiguration> =
                config.map(|c| vec![c.clone()]).unwrap_or_default();
            match self.config_with_stored_state(&candidates, &state).await {
                Some(matched) => {
                    return self
                        .check_auth_with_config(Some(&matched), all_configs, url)
                        .await
                }
                None => {
                    let e = AuthError::ConfigurationMismatch { state };
                    error!("{}", e);
                    self.events.fire(AuthEvent::CheckingAuthFinishedWithError {
                        config_id: config.map(|c| c.config_id.clone()),
                        message: e.to_string(),
                    });
                    return LoginResponse::error(
                        config.map(|c| c.config_id.as_str()),
                        e.to_string(),
                    );
                }
            }
        }

        self.check_auth_with_config(config, all_configs, url).await
    }

    /// Checks every configuration. With a state-carrying callback URL the
    /// owning configuration is checked against that URL and every other
    /// configuration against its own redirect URL; without one, all
    /// configurations are checked with the same URL. All checks run
    /// concurrently and the call completes only when every one has settled.
    pub async fn check_auth_multiple(
        &self,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> Vec<LoginResponse> {
        if let Some(state) = url.and_then(utils::url::get_state_param) {
            match self.config_with_stored_state(all_configs, &state).await {
                Some(active) => {
                    return self
                        .compose_multiple_login_results(all_configs, &active, url)
                        .await
                }
                None => {
                    let e = AuthError::ConfigurationMismatch { state };
                    error!("{}", e);
                    self.events.fire(AuthEvent::CheckingAuthFinishedWithError {
                        config_id: None,
                        message: e.to_string(),
                    });
                    return vec![LoginResponse::error(None, e.to_string())];
                }
            }
        }

        let checks = all_configs
            .iter()
            .map(|config| self.check_auth_with_config(Some(config), all_configs, url));
        join_all(checks).await
    }

    /// As `check_auth`, but an unauthenticated result additionally forces a
    /// live refresh against the identity provider before giving up.
    pub async fn check_auth_including_server(
        &self,
        config: Option<&OpenIdConfiguration>,
        all_configs: &[OpenIdConfiguration],
    ) -> LoginResponse {
        let response = self.check_auth_with_config(config, all_configs, None).await;
        if response.is_authenticated {
            return response;
        }

        let Some(config) = config else {
            return response;
        };

        let refreshed = self.renew.force_refresh_session(config, all_configs).await;
        if refreshed.is_authenticated {
            self.session.start(config, all_configs).await;
        }
        refreshed
    }

    /// Ends the configuration's session locally: liveness stopped, auth
    /// state destroyed, the authenticated-state-changed event fired. The
    /// provider-side session is untouched.
    pub async fn logoff_local(&self, config: &OpenIdConfiguration) {
        info!("Local logoff for config '{}'", config.config_id);
        self.session.stop(&config.config_id).await;
        if let Err(e) = self.auth_state.reset_auth_data(&config.config_id).await {
            error!(
                "Failed to reset auth data for config '{}': {}",
                config.config_id, e
            );
        }
    }

    async fn check_auth_with_config(
        &self,
        config: Option<&OpenIdConfiguration>,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
    ) -> LoginResponse {
        let Some(config) = config else {
            let e = AuthError::MissingConfiguration;
            error!("{}", e);
            return LoginResponse::error(None, e.to_string());
        };

        debug!(
            "Working with config '{}' using {}",
            config.config_id, config.authority
        );

        // Inside a popup the engine only relays the URL to the opener; the
        // opener's own check_auth does the real work.
        if self.popup.current_window_is_popup() {
            if let Some(url) = url {
                self.popup.send_message_to_main_window(url);
            }
            return LoginResponse::unauthenticated(Some(&config.config_id));
        }

        let is_callback = url.map(utils::url::is_callback).unwrap_or(false);
        debug!("currentUrl to check auth with: {:?}", url);

        match self
            .run_check(config, all_configs, url, is_callback)
            .await
        {
            Ok(response) => {
                self.events.fire(AuthEvent::CheckingAuthFinished {
                    config_id: Some(config.config_id.clone()),
                });
                response
            }
            Err(e) => {
                error!("Auth check failed for config '{}': {}", config.config_id, e);
                self.events.fire(AuthEvent::CheckingAuthFinishedWithError {
                    config_id: Some(config.config_id.clone()),
                    message: e.to_string(),
                });
                LoginResponse::error(Some(&config.config_id), e.to_string())
            }
        }
    }

    async fn run_check(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
        url: Option<&str>,
        is_callback: bool,
    ) -> Result<LoginResponse, AuthError> {
        if is_callback {
            if let Some(url) = url {
                self.callback
                    .handle_callback(url, config, all_configs)
                    .await?;
            }
        }

        let is_authenticated = self.auth_state.are_auth_storage_tokens_valid(config).await;

        if is_authenticated {
            self.session.start(config, all_configs).await;

            // The callback pipeline's commit already fired the events for
            // callback navigations.
            if !is_callback {
                self.auth_state
                    .set_authenticated_and_fire_event(&config.config_id, true)
                    .await?;
                self.auth_state
                    .publish_user_data_if_exists(&config.config_id)
                    .await?;
            }
        }

        debug!(
            "checkAuth completed for config '{}'. isAuthenticated: {}",
            config.config_id, is_authenticated
        );

        Ok(self.auth_state.login_response(config).await)
    }

    async fn config_with_stored_state(
        &self,
        configurations: &[OpenIdConfiguration],
        state_from_url: &str,
    ) -> Option<OpenIdConfiguration> {
        for config in configurations {
            let stored = self
                .auth_state
                .auth_state_control(&config.config_id)
                .await
                .ok()
                .flatten();
            if stored.as_deref() == Some(state_from_url) {
                return Some(config.clone());
            }
        }
        None
    }

    async fn compose_multiple_login_results(
        &self,
        configurations: &[OpenIdConfiguration],
        active_config: &OpenIdConfiguration,
        url: Option<&str>,
    ) -> Vec<LoginResponse> {
        let current = self.check_auth_with_config(Some(active_config), configurations, url);

        let others = configurations
            .iter()
            .filter(|c| c.config_id != active_config.config_id)
            .map(|config| {
                self.check_auth_with_config(
                    Some(config),
                    configurations,
                    Some(config.redirect_url.as_str()),
                )
            });

        let mut checks = vec![current];
        checks.extend(others);
        join_all(checks).await
    }
}
