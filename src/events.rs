//! Lifecycle event bus.
//!
//! Delivery is fire-and-forget over a broadcast channel: emission order is
//! preserved within a single pipeline run, and an absent subscriber is not
//! an error.

use tokio::sync::broadcast;

/// Named lifecycle events consumed by the host application.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    CheckingAuth {
        config_id: Option<String>,
    },
    CheckingAuthFinished {
        config_id: Option<String>,
    },
    CheckingAuthFinishedWithError {
        config_id: Option<String>,
        message: String,
    },
    AuthenticatedChanged {
        config_id: String,
        is_authenticated: bool,
    },
    UserDataChanged {
        config_id: String,
    },
    SessionChanged {
        config_id: String,
    },
    SessionTerminated {
        config_id: String,
    },
    SilentRenewStarted {
        config_id: String,
    },
    SilentRenewFailed {
        config_id: String,
        message: String,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        EventBus { sender }
    }

    /// Emits an event. A send error only means nobody is subscribed.
    pub fn fire(&self, event: AuthEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
