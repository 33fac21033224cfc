use std::collections::HashMap;

use chrono::Utc;
use jsonwebtoken::Algorithm;
use oidctron::config::{
    ConfigV1, LoggingConfig, OpenIdConfiguration, ProviderEndpoints, StoreConfig,
};
use oidctron::startup::{build_engine, EngineSurfaces};
use oidctron::state::EngineState;
use serde_json::json;
use url::Url;

/// The JWKS body every test provider serves: one symmetric key, the same
/// shape real providers publish for their signing keys.
pub const JWKS_BODY: &str =
    r#"{"keys": [{"kty": "oct", "k": "c2VjcmV0", "alg": "HS512", "kid": "testkid"}]}"#;

pub fn provider_config(config_id: &str, authority: &str) -> OpenIdConfiguration {
    OpenIdConfiguration {
        config_id: config_id.to_string(),
        authority: authority.to_string(),
        client_id: "client".to_string(),
        redirect_url: format!("https://app.example/{}/cb", config_id),
        post_logout_redirect_uri: None,
        response_type: "code".to_string(),
        scope: "openid profile".to_string(),
        endpoints: ProviderEndpoints {
            authorization_endpoint: format!("{}/authorize", authority),
            token_endpoint: format!("{}/token", authority),
            jwks_uri: format!("{}/jwks", authority),
            userinfo_endpoint: None,
            check_session_iframe: None,
            end_session_endpoint: None,
            par_endpoint: None,
        },
        use_pkce: true,
        use_pushed_authorization_requests: false,
        use_refresh_token: false,
        silent_renew: false,
        start_check_session: false,
        auto_user_info: false,
        silent_renew_timeout_secs: 2,
        check_session_interval_secs: 1,
        token_check_interval_secs: 1,
        renew_time_before_expiry_secs: 30,
        max_id_token_iat_offset_secs: 120,
    }
}

pub async fn build_test_engine(configurations: Vec<OpenIdConfiguration>) -> EngineState {
    build_test_engine_with_surfaces(configurations, EngineSurfaces::default()).await
}

pub async fn build_test_engine_with_surfaces(
    configurations: Vec<OpenIdConfiguration>,
    surfaces: EngineSurfaces,
) -> EngineState {
    let config = ConfigV1 {
        store: StoreConfig::default(),
        configurations,
        logging: LoggingConfig::default(),
    };
    build_engine(config, surfaces).await
}

/// Signs an id_token the test provider's JWKS validates, bound to the given
/// issuer and nonce.
pub fn sign_id_token(issuer: &str, nonce: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": issuer,
        "aud": "client",
        "sub": "user1",
        "exp": now + 300,
        "iat": now,
        "nonce": nonce,
    });

    let mut header = jsonwebtoken::Header::new(Algorithm::HS512);
    header.kid = Some("testkid".to_string());
    jsonwebtoken::encode(
        &header,
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"secret"),
    )
    .expect("failed to sign id_token")
}

/// The query parameters of a composed authorize URL, for fishing out the
/// state/nonce the engine generated.
pub fn query_map(url: &str) -> HashMap<String, String> {
    Url::parse(url)
        .expect("authorize URL should parse")
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}
