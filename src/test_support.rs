//! Builders shared by the unit tests.

use crate::config::{OpenIdConfiguration, ProviderEndpoints};

pub fn test_config(config_id: &str, authority: &str) -> OpenIdConfiguration {
    OpenIdConfiguration {
        config_id: config_id.to_string(),
        authority: authority.to_string(),
        client_id: "client".to_string(),
        redirect_url: "https://app.example/cb".to_string(),
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
        silent_renew_timeout_secs: 1,
        check_session_interval_secs: 1,
        token_check_interval_secs: 1,
        renew_time_before_expiry_secs: 30,
        max_id_token_iat_offset_secs: 120,
    }
}
