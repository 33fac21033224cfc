//! The session liveness subsystem: check-session polling, silent renewal
//! and the periodic token check, started together once a configuration
//! becomes authenticated and stopped together on logoff or teardown.

pub mod check_session;
pub mod frame;
pub mod periodic_check;
pub mod silent_renew;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::OpenIdConfiguration;

pub use check_session::CheckSessionPoller;
pub use frame::{NavigationFrame, NoFrame, SessionFrame, SessionStatus};
pub use periodic_check::PeriodicTokenCheck;
pub use silent_renew::SilentRenewRunner;

/// Supervises the per-configuration liveness set.
pub struct SessionLiveness {
    check_session: Arc<CheckSessionPoller>,
    renew: Arc<SilentRenewRunner>,
    periodic: Arc<PeriodicTokenCheck>,
    pollers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl SessionLiveness {
    pub fn new(
        check_session: Arc<CheckSessionPoller>,
        renew: Arc<SilentRenewRunner>,
        periodic: Arc<PeriodicTokenCheck>,
    ) -> Self {
        SessionLiveness {
            check_session,
            renew,
            periodic,
            pollers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts the liveness set for an authenticated configuration.
    /// Idempotent: the orchestrator calls this on every successful check.
    pub async fn start(
        &self,
        config: &OpenIdConfiguration,
        all_configs: &[OpenIdConfiguration],
    ) {
        self.periodic.start(config, all_configs).await;

        if CheckSessionPoller::is_check_session_configured(config) {
            let mut pollers = self.pollers.lock().await;
            if !pollers.contains_key(&config.config_id) {
                debug!(
                    "Starting check-session polling for config '{}'",
                    config.config_id
                );
                let handle = self.check_session.clone().spawn(
                    config.clone(),
                    all_configs.to_vec(),
                    self.renew.clone(),
                );
                pollers.insert(config.config_id.clone(), handle);
            }
        }
    }

    /// The renewal trigger, for hosts that want to force a refresh
    /// themselves.
    pub fn renewer(&self) -> Arc<SilentRenewRunner> {
        self.renew.clone()
    }

    /// Stops the liveness set: timers deregistered, the poller aborted.
    pub async fn stop(&self, config_id: &str) {
        if let Some(handle) = self.pollers.lock().await.remove(config_id) {
            handle.abort();
        }
        self.periodic.stop(config_id).await;
    }
}
