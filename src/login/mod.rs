//! Flow initiation: authorization-URL composition with fresh one-time
//! values, pushed authorization requests, and popup-based login.

pub mod popup;

use std::sync::Arc;

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::http::IdpClient;
use crate::store::AuthStateStore;
use crate::validation::pkce;

pub use popup::{NoPopup, PopupSurface};

pub struct LoginService {
    auth_state: Arc<AuthStateStore>,
    idp: Arc<IdpClient>,
}

impl LoginService {
    pub fn new(auth_state: Arc<AuthStateStore>, idp: Arc<IdpClient>) -> Self {
        LoginService { auth_state, idp }
    }

    /// Builds the authorization URL for a configuration, generating and
    /// persisting the `state`, `nonce` and (for code flows) PKCE pair the
    /// callback pipeline will later verify against. With
    /// `prompt_none = true` the URL is suitable for a silent-renew frame.
    pub async fn compose_authorize_url(
        &self,
        config: &OpenIdConfiguration,
        prompt_none: bool,
    ) -> Result<String, AuthError> {
        let config_id = &config.config_id;

        let state = Uuid::new_v4().simple().to_string();
        self.auth_state.set_auth_state_control(config_id, &state).await?;

        let nonce = Uuid::new_v4().simple().to_string();
        self.auth_state.set_auth_nonce(config_id, &nonce).await?;

        let mut params: Vec<(String, String)> = vec![
            ("client_id".to_string(), config.client_id.clone()),
            ("redirect_uri".to_string(), config.redirect_url.clone()),
            ("response_type".to_string(), config.response_type.clone()),
            ("scope".to_string(), config.scope.clone()),
            ("state".to_string(), state),
            ("nonce".to_string(), nonce),
        ];

        if prompt_none {
            params.push(("prompt".to_string(), "none".to_string()));
        }

        if config.is_code_flow() && config.use_pkce {
            let verifier = pkce::generate_verifier();
            let challenge = pkce::derive_challenge(&verifier);
            self.auth_state.set_code_verifier(config_id, &verifier).await?;
            self.auth_state
                .set_code_challenge(config_id, &challenge)
                .await?;
            params.push(("code_challenge".to_string(), challenge));
            params.push(("code_challenge_method".to_string(), "S256".to_string()));
        }

        let mut url = Url::parse(&config.endpoints.authorization_endpoint).map_err(|e| {
            AuthError::transport(format!("invalid authorization endpoint: {}", e))
        })?;

        if config.use_pushed_authorization_requests {
            let par_endpoint = config.endpoints.par_endpoint.as_deref().ok_or_else(|| {
                AuthError::transport(
                    "pushed authorization requests enabled but no PAR endpoint configured",
                )
            })?;

            // The parameters travel over the back channel; the redirect only
            // carries the handle the provider minted for them.
            let request_uri = self
                .idp
                .push_authorization_request(par_endpoint, &params)
                .await?;

            url.query_pairs_mut()
                .append_pair("client_id", &config.client_id)
                .append_pair("request_uri", &request_uri);
        } else {
            let mut query = url.query_pairs_mut();
            for (key, value) in &params {
                query.append_pair(key, value);
            }
        }

        debug!("Composed authorize URL for config '{}'", config_id);
        Ok(url.to_string())
    }

    /// Runs a login through a popup window. The popup navigates the
    /// authorization flow and posts the final callback URL back; the caller
    /// feeds that URL into `check_auth`.
    pub async fn login_with_popup(
        &self,
        config: &OpenIdConfiguration,
        popup: &dyn PopupSurface,
    ) -> Result<String, AuthError> {
        let authorize_url = self.compose_authorize_url(config, false).await?;
        popup
            .open(&authorize_url)
            .await
            .map_err(AuthError::transport)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use mockito::Server;

    use super::*;
    use crate::events::EventBus;
    use crate::store::MemoryStore;
    use crate::test_support::test_config;

    fn login_service() -> LoginService {
        LoginService::new(
            Arc::new(AuthStateStore::new(
                Arc::new(MemoryStore::new()),
                EventBus::new(),
            )),
            Arc::new(IdpClient::new()),
        )
    }

    fn query_map(url: &str) -> HashMap<String, String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[tokio::test]
    async fn test_authorize_url_carries_stored_one_time_values() {
        let service = login_service();
        let config = test_config("a", "https://idp.example");

        let url = service.compose_authorize_url(&config, false).await.unwrap();
        let query = query_map(&url);

        let stored_state = service.auth_state.auth_state_control("a").await.unwrap();
        let stored_nonce = service.auth_state.auth_nonce("a").await.unwrap();
        let stored_challenge = service.auth_state.code_challenge("a").await.unwrap();

        assert_eq!(query.get("state"), stored_state.as_ref());
        assert_eq!(query.get("nonce"), stored_nonce.as_ref());
        assert_eq!(query.get("code_challenge"), stored_challenge.as_ref());
        assert_eq!(query.get("code_challenge_method").map(String::as_str), Some("S256"));
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert!(query.get("prompt").is_none());
    }

    #[tokio::test]
    async fn test_silent_renew_url_prompts_none() {
        let service = login_service();
        let config = test_config("a", "https://idp.example");

        let url = service.compose_authorize_url(&config, true).await.unwrap();
        assert_eq!(
            query_map(&url).get("prompt").map(String::as_str),
            Some("none")
        );
    }

    #[tokio::test]
    async fn test_par_url_carries_request_uri_only() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("POST", "/par")
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(r#"{"request_uri": "urn:ietf:params:oauth:request_uri:xyz"}"#)
            .create_async()
            .await;

        let service = login_service();
        let mut config = test_config("a", &server.url());
        config.use_pushed_authorization_requests = true;
        config.endpoints.par_endpoint = Some(format!("{}/par", server.url()));

        let url = service.compose_authorize_url(&config, false).await.unwrap();
        let query = query_map(&url);

        m.assert_async().await;
        assert_eq!(
            query.get("request_uri").map(String::as_str),
            Some("urn:ietf:params:oauth:request_uri:xyz")
        );
        assert!(query.get("scope").is_none());
        assert!(query.get("state").is_none());
    }
}
