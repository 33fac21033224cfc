//! `AuthError` — the §7 error kinds, a `thiserror` enum grounded on the
//! octofhir-auth / PulseArc error idiom. These propagate internally via
//! `Result` + `?`; nothing crosses the public entry points as `Err`.

use thiserror::Error;

/// The authentication error kinds of spec §7.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No configuration matched the callback / request.
    #[error("could not find matching config")]
    MissingConfiguration,

    /// A callback's `state` did not resolve to its owning configuration.
    #[error("could not find matching config for state '{state}'")]
    ConfigurationMismatch { state: String },

    /// The returned anti-CSRF `state` did not match the stored control value.
    #[error("state mismatch: returned '{returned}' did not match the stored value")]
    StateMismatch { returned: String },

    /// The id_token `nonce` did not match the stored nonce.
    #[error("nonce mismatch")]
    NonceMismatch,

    /// The token signature (or signing-key material) could not be validated.
    #[error("signature invalid: {0}")]
    SignatureInvalid(String),

    /// A required claim was missing or failed validation.
    #[error("claim '{claim}' invalid: {reason}")]
    ClaimInvalid {
        claim: &'static str,
        reason: String,
    },

    /// The authorization grant was rejected or is otherwise unusable.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// A silent renewal did not complete before its deadline.
    #[error("silent renewal timed out for configuration '{config_id}'")]
    RenewalTimeout { config_id: String },

    /// A network / transport-level failure while talking to the provider.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// A failure reported by the pluggable `Store` surface.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl AuthError {
    /// Build a [`AuthError::TransportFailure`] from any displayable message.
    pub fn transport(message: impl Into<String>) -> Self {
        AuthError::TransportFailure(message.into())
    }

    /// Build a [`AuthError::Storage`] from any displayable message.
    pub fn storage(message: impl Into<String>) -> Self {
        AuthError::Storage(message.into())
    }

    /// Build a [`AuthError::ClaimInvalid`] for the named claim.
    pub fn claim(claim: &'static str, reason: impl Into<String>) -> Self {
        AuthError::ClaimInvalid {
            claim,
            reason: reason.into(),
        }
    }
}
