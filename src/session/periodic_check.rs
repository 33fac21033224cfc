use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::silent_renew::SilentRenewRunner;
use crate::config::OpenIdConfiguration;
use crate::store::AuthStateStore;

#[derive(Clone)]
struct PeriodicEntry {
    config: OpenIdConfiguration,
    all_configs: Vec<OpenIdConfiguration>,
}

/// One recurring timer shared by every configuration. Each tick compares
/// each registered configuration's token expiry against its safety margin
/// and triggers a proactive renewal before the token actually expires.
pub struct PeriodicTokenCheck {
    auth_state: Arc<AuthStateStore>,
    renew: Arc<SilentRenewRunner>,
    entries: Mutex<HashMap<String, PeriodicEntry>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTokenCheck {
    pub fn new(auth_state: Arc<AuthStateStore>, renew: Arc<SilentRenewRunner>) -> Self {
        PeriodicTokenCheck {
            auth_state,
            renew,
            entries: Mutex::new(HashMap::new()),
            task: Mutex::new(None),
        }
    }

    /// Registers a configuration; the first registration starts the shared
    /// timer, at that configuration's tick length.
    pub async fn start(
        self: &Arc<Self>,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) {
        let tick = Duration::from_secs(config.token_check_interval_secs.max(1));

        self.entries.lock().await.insert(
            config.config_id.clone(),
            PeriodicEntry {
                config: config.clone(),
                all_configs: all_configs.to_vec(),
            },
        );

        let mut task = self.task.lock().await;
        if task.is_none() {
            debug!("Starting periodic token check, tick {:?}", tick);
            let this = self.clone();
            *task = Some(tokio::spawn(async move { this.run(tick).await }));
        }
    }

    /// Deregisters a configuration; the last deregistration stops the timer.
    pub async fn stop(&self, config_id: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(config_id);
        if entries.is_empty() {
            if let Some(task) = self.task.lock().await.take() {
                task.abort();
            }
        }
    }

    async fn run(self: Arc<Self>, tick: Duration) {
        let mut interval = tokio::time::interval(tick);
        // The first tick of a tokio interval fires immediately; checks start
        // one full period after registration.
        interval.tick().await;

        loop {
            interval.tick().await;

            let entries: Vec<PeriodicEntry> =
                self.entries.lock().await.values().cloned().collect();

            for entry in entries {
                let config = &entry.config;
                let config_id = &config.config_id;

                let authenticated = self
                    .auth_state
                    .is_authenticated(config_id)
                    .await
                    .unwrap_or(false);
                if !authenticated {
                    continue;
                }

                let Some(remaining) = self.auth_state.seconds_until_expiry(config_id).await
                else {
                    continue;
                };

                if remaining <= config.renew_time_before_expiry_secs {
                    debug!(
                        "Token for config '{}' expires in {}s, renewing",
                        config_id, remaining
                    );
                    if let Err(e) = self.renew.renew(config, &entry.all_configs).await {
                        warn!("Proactive renewal failed for config '{}': {}", config_id, e);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Utc;
    use mockito::Server;
    use tokio::time::{sleep, Duration};

    use super::*;
    use crate::callback::{create_callback_handlers, CallbackService};
    use crate::events::EventBus;
    use crate::http::IdpClient;
    use crate::login::LoginService;
    use crate::models::TokenResponse;
    use crate::session::frame::NavigationFrame;
    use crate::store::MemoryStore;
    use crate::test_support::test_config;
    use crate::validation::{SigningKeyService, TokenValidator};

    struct UnusedFrame;

    #[async_trait]
    impl NavigationFrame for UnusedFrame {
        async fn navigate(&self, _url: &str) -> Result<String, String> {
            Err("not expected in this test".to_string())
        }
    }

    #[tokio::test]
    async fn test_expiring_token_triggers_refresh_exchange() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/jwks")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"keys": []}"#)
            .create_async()
            .await;
        let m = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "fresh", "expires_in": 3600, "refresh_token": "rt2"}"#)
            .create_async()
            .await;

        let events = EventBus::new();
        let auth_state = Arc::new(AuthStateStore::new(
            Arc::new(MemoryStore::new()),
            events.clone(),
        ));
        let idp = Arc::new(IdpClient::new());
        let keys = Arc::new(SigningKeyService::new(idp.clone()));
        let validator = Arc::new(TokenValidator::new(keys.clone()));
        let callback = Arc::new(CallbackService::new(create_callback_handlers(
            auth_state.clone(),
            keys,
            validator,
            idp.clone(),
        )));
        let login = Arc::new(LoginService::new(auth_state.clone(), idp));
        let renew = Arc::new(SilentRenewRunner::new(
            Arc::new(UnusedFrame),
            login,
            callback,
            auth_state.clone(),
            events,
        ));

        let mut config = test_config("a", &server.url());
        config.use_refresh_token = true;
        config.token_check_interval_secs = 1;
        config.renew_time_before_expiry_secs = 30;

        // Authenticated, but inside the renewal margin.
        let tokens = TokenResponse {
            access_token: Some("stale".to_string()),
            refresh_token: Some("rt".to_string()),
            ..Default::default()
        };
        auth_state
            .store_token_response("a", &tokens, Utc::now().timestamp() + 10)
            .await
            .unwrap();
        auth_state
            .set_authenticated_and_fire_event("a", true)
            .await
            .unwrap();

        let checker = Arc::new(PeriodicTokenCheck::new(auth_state.clone(), renew));
        checker.start(&config, &[config.clone()]).await;

        // Two tick lengths are enough for the first real check to run.
        sleep(Duration::from_millis(2500)).await;
        checker.stop("a").await;

        m.assert_async().await;
        assert_eq!(
            auth_state.access_token("a").await.unwrap(),
            Some("fresh".to_string())
        );
    }
}
