//! Engine assembly.
//!
//! A single composition root builds the validation engine, auth state
//! store, callback pipeline, session liveness subsystem and orchestrator,
//! passing every dependency through constructors. No ambient registry.

use std::sync::Arc;

use tracing::info;

use crate::auth::CheckAuthService;
use crate::callback::{create_callback_handlers, CallbackService};
use crate::config::ConfigV1;
use crate::events::EventBus;
use crate::http::IdpClient;
use crate::login::{LoginService, NoPopup, PopupSurface};
use crate::session::{
    CheckSessionPoller, NavigationFrame, NoFrame, PeriodicTokenCheck, SessionFrame,
    SessionLiveness, SilentRenewRunner,
};
use crate::state::EngineState;
use crate::store::{create_store, AuthStateStore, Store};
use crate::validation::{SigningKeyService, TokenValidator};

/// The host-provided navigation surfaces. Hosts without window/iframe
/// support keep the defaults; silent renewal then relies on refresh tokens.
pub struct EngineSurfaces {
    pub renew_frame: Arc<dyn NavigationFrame>,
    pub session_frame: Arc<dyn SessionFrame>,
    pub popup: Arc<dyn PopupSurface>,
}

impl Default for EngineSurfaces {
    fn default() -> Self {
        let frame = Arc::new(NoFrame);
        EngineSurfaces {
            renew_frame: frame.clone(),
            session_frame: frame,
            popup: Arc::new(NoPopup),
        }
    }
}

/// Builds a ready-to-use engine from the configuration and surfaces.
pub async fn build_engine(config: ConfigV1, surfaces: EngineSurfaces) -> EngineState {
    let store = create_store(&config.store).await;
    build_engine_with_store(config, surfaces, store)
}

/// As `build_engine`, for hosts bringing their own store backend.
pub fn build_engine_with_store(
    config: ConfigV1,
    surfaces: EngineSurfaces,
    store: Arc<dyn Store>,
) -> EngineState {
    info!(
        "Assembling engine for {} configuration(s)",
        config.configurations.len()
    );

    let config = Arc::new(config);
    let events = EventBus::new();
    let auth_state = Arc::new(AuthStateStore::new(store.clone(), events.clone()));

    let idp = Arc::new(IdpClient::new());
    let keys = Arc::new(SigningKeyService::new(idp.clone()));
    let validator = Arc::new(TokenValidator::new(keys.clone()));

    let callback = Arc::new(CallbackService::new(create_callback_handlers(
        auth_state.clone(),
        keys,
        validator,
        idp.clone(),
    )));

    let login = Arc::new(LoginService::new(auth_state.clone(), idp.clone()));

    let renew = Arc::new(SilentRenewRunner::new(
        surfaces.renew_frame,
        login.clone(),
        callback.clone(),
        auth_state.clone(),
        events.clone(),
    ));
    let check_session = Arc::new(CheckSessionPoller::new(
        surfaces.session_frame,
        auth_state.clone(),
        events.clone(),
    ));
    let periodic = Arc::new(PeriodicTokenCheck::new(auth_state.clone(), renew.clone()));
    let session = Arc::new(SessionLiveness::new(check_session, renew.clone(), periodic));

    let check_auth = Arc::new(CheckAuthService::new(
        auth_state,
        callback,
        session.clone(),
        renew,
        surfaces.popup,
        events.clone(),
    ));

    EngineState {
        config,
        check_auth,
        login,
        session,
        events,
        store,
    }
}
