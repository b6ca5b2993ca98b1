pub mod claims;
pub mod codec;
pub mod error;
pub mod factory;
pub mod refresh;
pub mod service;
pub mod types;

pub use codec::{CookieSettings, SessionCodec};
pub use error::AuthError;
pub use factory::build_auth_service;
pub use refresh::{RefreshError, SessionRefresher};
pub use service::{AuthService, AuthSettings, ResolveOptions, SignOut};
pub use types::{AuthState, Authorized, ResolvedAuth, Session, UnauthorizedReason, User};
