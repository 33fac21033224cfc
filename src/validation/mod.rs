pub mod jwks;
pub mod pkce;
pub mod token_validator;

pub use jwks::SigningKeyService;
pub use token_validator::{validate_state, TokenValidator};
