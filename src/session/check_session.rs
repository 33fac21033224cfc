use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, warn};

use super::frame::{SessionFrame, SessionStatus};
use super::silent_renew::SilentRenewRunner;
use crate::config::OpenIdConfiguration;
use crate::events::{AuthEvent, EventBus};
use crate::store::AuthStateStore;

const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Polls the provider's check-session endpoint on a fixed interval and
/// compares the result against the stored `session_state`. A mismatch means
/// the provider-side session changed (e.g. remote logout): the poller fires
/// the session-changed event and triggers a renewal, or tears the session
/// down when no renewal is configured.
pub struct CheckSessionPoller {
    frame: Arc<dyn SessionFrame>,
    auth_state: Arc<AuthStateStore>,
    events: EventBus,
}

impl CheckSessionPoller {
    pub fn new(
        frame: Arc<dyn SessionFrame>,
        auth_state: Arc<AuthStateStore>,
        events: EventBus,
    ) -> Self {
        CheckSessionPoller {
            frame,
            auth_state,
            events,
        }
    }

    pub fn is_check_session_configured(config: &OpenIdConfiguration) -> bool {
        config.start_check_session && config.endpoints.check_session_iframe.is_some()
    }

    /// Spawns the polling task for one configuration. The caller owns the
    /// handle and aborts it on logoff/teardown.
    pub fn spawn(
        self: Arc<Self>,
        config: OpenIdConfiguration,
        all_configs: Vec<OpenIdConfiguration>,
        renew: Arc<SilentRenewRunner>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let Some(endpoint) = config.endpoints.check_session_iframe.clone() else {
                return;
            };

            let mut interval = tokio::time::interval(Duration::from_secs(
                config.check_session_interval_secs.max(1),
            ));
            let mut consecutive_errors = 0u32;

            loop {
                interval.tick().await;

                // Nothing to compare until a callback stored a session_state.
                let session_state = match self.auth_state.session_state(&config.config_id).await {
                    Ok(Some(session_state)) => session_state,
                    _ => continue,
                };

                match self
                    .frame
                    .poll(&endpoint, &config.client_id, &session_state)
                    .await
                {
                    SessionStatus::Unchanged => consecutive_errors = 0,
                    SessionStatus::Changed => {
                        consecutive_errors = 0;
                        self.events.fire(AuthEvent::SessionChanged {
                            config_id: config.config_id.clone(),
                        });

                        if SilentRenewRunner::is_silent_renew_configured(&config)
                            || config.use_refresh_token
                        {
                            if let Err(e) = renew.renew(&config, &all_configs).await {
                                warn!(
                                    "Renewal after session change failed for config '{}': {}",
                                    config.config_id, e
                                );
                            }
                        } else {
                            // No renewal configured: the session is gone.
                            self.events.fire(AuthEvent::SessionTerminated {
                                config_id: config.config_id.clone(),
                            });
                            if let Err(e) =
                                self.auth_state.reset_auth_data(&config.config_id).await
                            {
                                warn!(
                                    "Failed to reset auth data for config '{}': {}",
                                    config.config_id, e
                                );
                            }
                            return;
                        }
                    }
                    SessionStatus::Error(message) => {
                        consecutive_errors += 1;
                        warn!(
                            "Check-session poll failed for config '{}' ({}/{}): {}",
                            config.config_id, consecutive_errors, MAX_CONSECUTIVE_ERRORS, message
                        );
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            error!(
                                "Stopping check-session polling for config '{}'",
                                config.config_id
                            );
                            return;
                        }
                    }
                }
            }
        })
    }
}
