//! Shared engine state.
//!
//! Holds the components a host application interacts with after the
//! composition root has wired everything together.

use std::sync::Arc;

use crate::auth::CheckAuthService;
use crate::config::ConfigV1;
use crate::events::EventBus;
use crate::login::LoginService;
use crate::session::SessionLiveness;
use crate::store::Store;

/// The assembled engine, cloned freely by the host.
#[derive(Clone)]
pub struct EngineState {
    /// Engine configuration loaded at startup.
    pub config: Arc<ConfigV1>,
    /// The orchestration entry points (`check_auth` and friends).
    pub check_auth: Arc<CheckAuthService>,
    /// Flow initiation: authorize URLs, PAR, popup login.
    pub login: Arc<LoginService>,
    /// The session liveness supervisor, for explicit start/stop.
    pub session: Arc<SessionLiveness>,
    /// The lifecycle event bus consumers subscribe to.
    pub events: EventBus,
    /// The underlying key-value store.
    pub store: Arc<dyn Store>,
}
