use async_trait::async_trait;

/// A hidden frame the engine can point at an authorization URL. The
/// implementation observes the frame's navigation and resolves with the
/// callback URL it lands on. In a browser this wraps an iframe; in tests a
/// canned future.
#[async_trait]
pub trait NavigationFrame: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<String, String>;
}

/// What one check-session poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Unchanged,
    Changed,
    Error(String),
}

/// The OP session-check frame: given the provider's check-session endpoint,
/// the client id and the stored `session_state` opaque value, reports
/// whether the provider-side session still matches.
#[async_trait]
pub trait SessionFrame: Send + Sync {
    async fn poll(&self, endpoint: &str, client_id: &str, session_state: &str) -> SessionStatus;
}

/// The default surface for hosts without frame support: silent renew fails
/// over to refresh tokens and check-session reports errors.
pub struct NoFrame;

#[async_trait]
impl NavigationFrame for NoFrame {
    async fn navigate(&self, _url: &str) -> Result<String, String> {
        Err("no navigation frame configured".to_string())
    }
}

#[async_trait]
impl SessionFrame for NoFrame {
    async fn poll(&self, _endpoint: &str, _client_id: &str, _session_state: &str) -> SessionStatus {
        SessionStatus::Error("no session frame configured".to_string())
    }
}
