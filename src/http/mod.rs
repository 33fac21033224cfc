//! The identity-provider transport: token exchange, JWKS retrieval, userinfo
//! and pushed-authorization requests. Only request intent lives here; callers
//! decide what the responses mean.

use jsonwebtoken::jwk::JwkSet;
use serde_json::Value;
use tracing::debug;

use crate::config::OpenIdConfiguration;
use crate::error::AuthError;
use crate::models::TokenResponse;

pub struct IdpClient {
    client: reqwest::Client,
}

impl IdpClient {
    pub fn new() -> Self {
        IdpClient {
            client: reqwest::Client::new(),
        }
    }

    /// Retrieves the signing keys (JWKS) from the provider.
    pub async fn fetch_jwks(&self, jwks_uri: &str) -> Result<JwkSet, AuthError> {
        debug!("Fetching signing keys from {}", jwks_uri);
        let res = self
            .client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to download signing keys: {}", e)))?;

        if !res.status().is_success() {
            return Err(AuthError::transport(format!(
                "Failed to download signing keys: {}",
                res.status()
            )));
        }

        res.json::<JwkSet>()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to parse signing keys: {}", e)))
    }

    /// Exchanges an authorization code (plus PKCE verifier) for tokens.
    pub async fn request_tokens_with_code(
        &self,
        config: &OpenIdConfiguration,
        code: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenResponse, AuthError> {
        debug!(
            "Exchanging authorization code at '{}'",
            config.endpoints.token_endpoint
        );

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
            ("code", code),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }

        self.token_request(&config.endpoints.token_endpoint, &form)
            .await
    }

    /// Exchanges a refresh token for fresh tokens.
    pub async fn request_tokens_with_refresh(
        &self,
        config: &OpenIdConfiguration,
        refresh_token: &str,
    ) -> Result<TokenResponse, AuthError> {
        debug!(
            "Exchanging refresh token at '{}'",
            config.endpoints.token_endpoint
        );

        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.token_request(&config.endpoints.token_endpoint, &form)
            .await
    }

    async fn token_request(
        &self,
        token_endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let res = self
            .client
            .post(token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to call token endpoint: {}", e)))?;

        let status = res.status();
        if status.is_success() {
            return res.json::<TokenResponse>().await.map_err(|e| {
                AuthError::transport(format!("Failed to parse token response: {}", e))
            });
        }

        // RFC 6749 §5.2 error responses carry a JSON body naming the failure.
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        let error = body
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_error");
        let description = body
            .get("error_description")
            .and_then(|v| v.as_str())
            .map(|d| format!(": {}", d))
            .unwrap_or_default();

        Err(AuthError::InvalidGrant(format!(
            "{} ({}){}",
            error, status, description
        )))
    }

    /// Fetches the userinfo claims with the access token as bearer.
    pub async fn fetch_user_info(
        &self,
        userinfo_endpoint: &str,
        access_token: &str,
    ) -> Result<Value, AuthError> {
        let res = self
            .client
            .get(userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                AuthError::transport(format!("Failed to call userinfo endpoint: {}", e))
            })?;

        if !res.status().is_success() {
            return Err(AuthError::transport(format!(
                "Userinfo endpoint returned {}",
                res.status()
            )));
        }

        res.json::<Value>()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to parse userinfo JSON: {}", e)))
    }

    /// Pushes authorization parameters to the PAR endpoint and returns the
    /// `request_uri` to redirect with (RFC 9126).
    pub async fn push_authorization_request(
        &self,
        par_endpoint: &str,
        params: &[(String, String)],
    ) -> Result<String, AuthError> {
        let res = self
            .client
            .post(par_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to call PAR endpoint: {}", e)))?;

        if !res.status().is_success() {
            return Err(AuthError::InvalidGrant(format!(
                "PAR endpoint rejected the request: {}",
                res.status()
            )));
        }

        let body = res
            .json::<Value>()
            .await
            .map_err(|e| AuthError::transport(format!("Failed to parse PAR response: {}", e)))?;

        body.get("request_uri")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                AuthError::transport("PAR response did not contain a request_uri".to_string())
            })
    }
}

impl Default for IdpClient {
    fn default() -> Self {
        Self::new()
    }
}
