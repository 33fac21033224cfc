use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The normalized result of one auth check for one configuration.
///
/// Failure is communicated through `is_authenticated: false` plus
/// `error_message`; the orchestrator never returns an `Err` to its callers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LoginResponse {
    pub is_authenticated: bool,
    pub user_data: Option<Value>,
    pub id_token: Option<String>,
    pub access_token: Option<String>,
    pub config_id: Option<String>,
    pub error_message: Option<String>,
}

impl LoginResponse {
    /// An unauthenticated response with no error, e.g. for empty storage.
    pub fn unauthenticated(config_id: Option<&str>) -> Self {
        LoginResponse {
            config_id: config_id.map(str::to_string),
            ..Default::default()
        }
    }

    /// An unauthenticated response flagged with an error message.
    pub fn error(config_id: Option<&str>, message: impl Into<String>) -> Self {
        LoginResponse {
            config_id: config_id.map(str::to_string),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }
}
