mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use common::*;
use mockito::Server;
use oidctron::events::AuthEvent;
use oidctron::login::PopupSurface;
use oidctron::models::LoginResponse;
use oidctron::startup::EngineSurfaces;
use serde_json::json;

#[tokio::test]
async fn test_empty_storage_resolves_unauthenticated() {
    let config = provider_config("a", "https://idp.example");
    let engine = build_test_engine(vec![config.clone()]).await;

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], None)
        .await;

    assert_eq!(
        response,
        LoginResponse {
            is_authenticated: false,
            user_data: None,
            id_token: None,
            access_token: None,
            config_id: Some("a".to_string()),
            error_message: None,
        }
    );
}

#[tokio::test]
async fn test_missing_configuration_resolves_error() {
    let engine = build_test_engine(vec![]).await;

    let response = engine.check_auth.check_auth(None, &[], None).await;

    assert!(!response.is_authenticated);
    assert!(response.error_message.is_some());
}

#[tokio::test]
async fn test_unknown_state_resolves_configuration_mismatch() {
    let config = provider_config("a", "https://idp.example");
    let engine = build_test_engine(vec![config.clone()]).await;

    let url = "https://app.example/a/cb?code=c&state=nobody-stored-this";

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], Some(url))
        .await;
    assert!(!response.is_authenticated);
    assert!(response
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("could not find matching config"));

    let responses = engine
        .check_auth
        .check_auth_multiple(&[config.clone()], Some(url))
        .await;
    assert_eq!(responses.len(), 1);
    assert!(responses[0]
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("could not find matching config"));
}

#[tokio::test]
async fn test_code_flow_callback_commits_then_replay_fails() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jwks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(JWKS_BODY)
        .create_async()
        .await;

    let config = provider_config("a", &server.url());
    let engine = build_test_engine(vec![config.clone()]).await;

    // Initiate the flow so state/nonce/PKCE land in storage.
    let authorize_url = engine
        .login
        .compose_authorize_url(&config, false)
        .await
        .unwrap();
    let query = query_map(&authorize_url);
    let state = query.get("state").unwrap().clone();
    let nonce = query.get("nonce").unwrap().clone();

    let id_token = sign_id_token(&server.url(), &nonce);
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "at",
                "id_token": id_token,
                "refresh_token": "rt",
                "expires_in": 3600,
                "token_type": "Bearer",
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;

    let callback_url = format!(
        "{}?code=thecode&state={}&session_state=opaque",
        config.redirect_url, state
    );

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], Some(&callback_url))
        .await;

    assert!(response.is_authenticated, "{:?}", response.error_message);
    assert_eq!(response.access_token, Some("at".to_string()));
    assert!(response.id_token.is_some());
    assert_eq!(response.config_id, Some("a".to_string()));

    // The one-time values are gone after the commit.
    assert_eq!(engine.store.read("auth_state_control", "a").await.unwrap(), None);
    assert_eq!(engine.store.read("auth_nonce", "a").await.unwrap(), None);
    assert_eq!(engine.store.read("code_verifier", "a").await.unwrap(), None);

    // Replaying the identical callback cannot re-authenticate: no stored
    // state matches it anymore, and the token endpoint is not called again.
    let replayed = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], Some(&callback_url))
        .await;

    assert!(!replayed.is_authenticated);
    assert!(replayed
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("could not find matching config"));
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_check_auth_multiple_resolves_matched_config_and_others() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jwks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(JWKS_BODY)
        .create_async()
        .await;

    let config_a = provider_config("a", "https://idp-a.example");
    let config_b = provider_config("b", &server.url());
    let all = vec![config_a.clone(), config_b.clone()];
    let engine = build_test_engine(all.clone()).await;

    let authorize_url = engine
        .login
        .compose_authorize_url(&config_b, false)
        .await
        .unwrap();
    let query = query_map(&authorize_url);
    let state = query.get("state").unwrap().clone();
    let nonce = query.get("nonce").unwrap().clone();

    let id_token = sign_id_token(&server.url(), &nonce);
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "access_token": "at-b",
                "id_token": id_token,
                "expires_in": 3600,
            })
            .to_string(),
        )
        .create_async()
        .await;

    let callback_url = format!("{}?code=thecode&state={}", config_b.redirect_url, state);

    let responses = engine
        .check_auth
        .check_auth_multiple(&all, Some(&callback_url))
        .await;

    // The matched config resolves via the callback, every other config via
    // its own redirect URL; both settle before the call returns.
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0].config_id, Some("b".to_string()));
    assert!(responses[0].is_authenticated, "{:?}", responses[0].error_message);
    assert_eq!(responses[1].config_id, Some("a".to_string()));
    assert!(!responses[1].is_authenticated);
    assert!(responses[1].error_message.is_none());
}

#[tokio::test]
async fn test_check_auth_multiple_without_state_preserves_order() {
    let configs = vec![
        provider_config("a", "https://idp-a.example"),
        provider_config("b", "https://idp-b.example"),
        provider_config("c", "https://idp-c.example"),
    ];
    let engine = build_test_engine(configs.clone()).await;

    let responses = engine.check_auth.check_auth_multiple(&configs, None).await;

    assert_eq!(responses.len(), 3);
    let ids: Vec<_> = responses.iter().map(|r| r.config_id.clone()).collect();
    assert_eq!(
        ids,
        vec![
            Some("a".to_string()),
            Some("b".to_string()),
            Some("c".to_string())
        ]
    );
    assert!(responses.iter().all(|r| !r.is_authenticated));
}

#[tokio::test]
async fn test_valid_stored_tokens_authenticate_and_fire_event_once() {
    let config = provider_config("a", "https://idp.example");
    let engine = build_test_engine(vec![config.clone()]).await;

    let expires_at = (Utc::now().timestamp() + 3600).to_string();
    engine.store.write("access_token", "a", "at").await.unwrap();
    engine.store.write("id_token", "a", "it").await.unwrap();
    engine.store.write("expires_at", "a", &expires_at).await.unwrap();
    engine.store.write("is_authenticated", "a", "true").await.unwrap();

    let mut rx = engine.events.subscribe();

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], None)
        .await;
    assert!(response.is_authenticated);

    let mut authenticated_events = 0;
    loop {
        match rx.try_recv() {
            Ok(AuthEvent::AuthenticatedChanged {
                config_id,
                is_authenticated: true,
            }) if config_id == "a" => authenticated_events += 1,
            Ok(_) => {}
            Err(_) => break,
        }
    }
    assert_eq!(authenticated_events, 1);
}

#[tokio::test]
async fn test_check_auth_including_server_forces_refresh() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/jwks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(JWKS_BODY)
        .create_async()
        .await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"access_token": "fresh", "expires_in": 3600}).to_string())
        .create_async()
        .await;

    let mut config = provider_config("a", &server.url());
    config.use_refresh_token = true;
    let engine = build_test_engine(vec![config.clone()]).await;

    // Not authenticated, but a refresh token survived in storage.
    engine.store.write("refresh_token", "a", "rt").await.unwrap();

    let response = engine
        .check_auth
        .check_auth_including_server(Some(&config), &[config.clone()])
        .await;

    assert!(response.is_authenticated, "{:?}", response.error_message);
    assert_eq!(response.access_token, Some("fresh".to_string()));
}

#[tokio::test]
async fn test_logoff_local_destroys_session() {
    let config = provider_config("a", "https://idp.example");
    let engine = build_test_engine(vec![config.clone()]).await;

    let expires_at = (Utc::now().timestamp() + 3600).to_string();
    engine.store.write("access_token", "a", "at").await.unwrap();
    engine.store.write("id_token", "a", "it").await.unwrap();
    engine.store.write("expires_at", "a", &expires_at).await.unwrap();
    engine.store.write("is_authenticated", "a", "true").await.unwrap();

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], None)
        .await;
    assert!(response.is_authenticated);

    engine.check_auth.logoff_local(&config).await;

    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], None)
        .await;
    assert!(!response.is_authenticated);
    assert_eq!(engine.store.read("access_token", "a").await.unwrap(), None);
}

struct RecordingPopup {
    forwarded: Mutex<Option<String>>,
}

#[async_trait]
impl PopupSurface for RecordingPopup {
    fn current_window_is_popup(&self) -> bool {
        true
    }

    fn send_message_to_main_window(&self, url: &str) {
        *self.forwarded.lock().unwrap() = Some(url.to_string());
    }

    async fn open(&self, _authorize_url: &str) -> Result<String, String> {
        Err("already inside a popup".to_string())
    }
}

#[tokio::test]
async fn test_popup_context_forwards_url_to_opener() {
    let popup = Arc::new(RecordingPopup {
        forwarded: Mutex::new(None),
    });
    let surfaces = EngineSurfaces {
        popup: popup.clone(),
        ..Default::default()
    };

    let config = provider_config("a", "https://idp.example");
    let engine = build_test_engine_with_surfaces(vec![config.clone()], surfaces).await;

    // A callback without a state parameter lands directly in the popup
    // branch; the popup only relays, the opener does the real work.
    let url = "https://app.example/a/cb?code=abc";
    let response = engine
        .check_auth
        .check_auth(Some(&config), &[config.clone()], Some(url))
        .await;

    assert!(!response.is_authenticated);
    assert!(response.error_message.is_none());
    assert_eq!(
        popup.forwarded.lock().unwrap().as_deref(),
        Some(url)
    );
}
