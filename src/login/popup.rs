use async_trait::async_trait;
use tracing::debug;

/// The popup window surface.
///
/// Message-passing contract: the popup navigates the authorization flow and
/// posts the final callback URL back to its opener; the opener feeds that
/// URL into `check_auth`. Conversely, when the engine itself runs inside a
/// popup, `check_auth` forwards the raw URL to the opener and stops.
#[async_trait]
pub trait PopupSurface: Send + Sync {
    /// Whether the running context is itself a popup window.
    fn current_window_is_popup(&self) -> bool;

    /// Posts the raw callback URL to the opener window.
    fn send_message_to_main_window(&self, url: &str);

    /// Opens a popup at the authorize URL and resolves with the callback URL
    /// it posted back.
    async fn open(&self, authorize_url: &str) -> Result<String, String>;
}

/// The default surface for hosts without window management.
pub struct NoPopup;

#[async_trait]
impl PopupSurface for NoPopup {
    fn current_window_is_popup(&self) -> bool {
        false
    }

    fn send_message_to_main_window(&self, url: &str) {
        debug!("No popup surface configured, dropping message: {}", url);
    }

    async fn open(&self, _authorize_url: &str) -> Result<String, String> {
        Err("no popup surface configured".to_string())
    }
}
