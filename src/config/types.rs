use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::logging::LoggingConfig;
use super::store::StoreConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: the identity-provider configurations plus
/// store and logging settings.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    #[serde(default)]
    pub store: StoreConfig,
    pub configurations: Vec<OpenIdConfiguration>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Load config from a YAML file named "config.yaml" in the current directory,
/// with environment overrides under the OIDCTRON_ prefix.
pub fn load_config() -> Result<ConfigV1, String> {
    let figment = Figment::new()
        .merge(Yaml::file("./config.yaml"))
        .merge(Env::prefixed("OIDCTRON_").split("__"));
    let config = figment
        .extract::<Config>()
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    match config {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema).unwrap());
}

/// The endpoints of one identity provider. Discovery-document fetching is a
/// host concern; the resolved endpoints are handed in here.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct ProviderEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub userinfo_endpoint: Option<String>,
    pub check_session_iframe: Option<String>,
    pub end_session_endpoint: Option<String>,
    pub par_endpoint: Option<String>,
}

/// One identity-provider configuration. Immutable for the lifetime of the
/// process; `config_id` is the unique key everything else is stored under.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct OpenIdConfiguration {
    pub config_id: String,
    pub authority: String,
    pub client_id: String,
    pub redirect_url: String,
    pub post_logout_redirect_uri: Option<String>,

    /// "code" (authorization code + PKCE) or "id_token token" (implicit).
    #[serde(default = "default_response_type")]
    pub response_type: String,
    #[serde(default = "default_scope")]
    pub scope: String,

    pub endpoints: ProviderEndpoints,

    #[serde(default = "default_true")]
    pub use_pkce: bool,
    #[serde(default)]
    pub use_pushed_authorization_requests: bool,
    #[serde(default)]
    pub use_refresh_token: bool,
    #[serde(default)]
    pub silent_renew: bool,
    #[serde(default)]
    pub start_check_session: bool,
    #[serde(default = "default_true")]
    pub auto_user_info: bool,

    #[serde(default = "default_silent_renew_timeout")]
    pub silent_renew_timeout_secs: u64,
    #[serde(default = "default_check_session_interval")]
    pub check_session_interval_secs: u64,
    #[serde(default = "default_token_check_interval")]
    pub token_check_interval_secs: u64,
    #[serde(default = "default_renew_margin")]
    pub renew_time_before_expiry_secs: i64,
    #[serde(default = "default_iat_offset")]
    pub max_id_token_iat_offset_secs: i64,
}

impl OpenIdConfiguration {
    pub fn is_code_flow(&self) -> bool {
        self.response_type == "code"
    }
}

fn default_response_type() -> String {
    "code".to_string()
}

fn default_scope() -> String {
    "openid profile email".to_string()
}

fn default_true() -> bool {
    true
}

fn default_silent_renew_timeout() -> u64 {
    20
}

fn default_check_session_interval() -> u64 {
    3
}

fn default_token_check_interval() -> u64 {
    3
}

fn default_renew_margin() -> i64 {
    30
}

fn default_iat_offset() -> i64 {
    120
}
