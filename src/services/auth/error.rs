/*
 * Responsibility
 * - 認証まわりの制御フロー (redirect / deny) と、設定ミス (middleware 未登録) を型で区別する
 * - セッション無し・refresh 失敗はここには来ない (Unauthorized として解決される)
 */
use axum::http::HeaderValue;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Intentional exit: send the caller to sign in.
    ///
    /// `set_cookie` is only populated by standalone (legacy) resolution; in the
    /// integrated pipeline the commit step writes the cookie instead.
    #[error("redirect to {location}")]
    Redirect {
        location: String,
        set_cookie: Option<HeaderValue>,
    },

    #[error("authentication required")]
    Denied,

    /// Programming error: an accessor ran on a route the session stage does not wrap.
    #[error("session middleware is not registered for this route")]
    MiddlewareNotRegistered,
}

impl AuthError {
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect {
            location: location.into(),
            set_cookie: None,
        }
    }
}
