pub mod callback;
pub mod login;

pub use callback::{CallbackContext, CallbackParams, FlowKind, IdTokenClaims, TokenResponse};
pub use login::LoginResponse;
