/*
 * Responsibility
 * - session cookie の中身 (Session / User / Impersonator)
 * - 1 リクエストにつき 1 つだけ作られる解決結果 (ResolvedAuth) の型
 *
 * Notes
 * - ResolvedAuth は Arc で共有し、作成後は読み取り専用
 * - access token は JSON view に出さない
 */
use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

/// Decoded contents of the sealed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonator: Option<Impersonator>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impersonator {
    pub email: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Signed-in caller, as seen by handlers past the access gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authorized {
    pub user: User,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub session_id: String,
    pub organization_id: Option<String>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub entitlements: Vec<String>,
    pub impersonator: Option<Impersonator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnauthorizedReason {
    NoSession,
    RefreshFailed,
}

impl UnauthorizedReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoSession => "no-session",
            Self::RefreshFailed => "refresh-failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AuthState {
    Authorized(Authorized),
    Unauthorized { reason: UnauthorizedReason },
}

/// The per-request authentication result.
///
/// `pending_cookie` is the `Set-Cookie` value the commit step still has to
/// write: the re-sealed session after a rotation, or a clearing cookie when a
/// stale session has to be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuth {
    pub state: AuthState,
    pub refreshed: bool,
    pub pending_cookie: Option<HeaderValue>,
}

impl ResolvedAuth {
    pub fn unauthorized(reason: UnauthorizedReason) -> Self {
        Self {
            state: AuthState::Unauthorized { reason },
            refreshed: false,
            pending_cookie: None,
        }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self.state, AuthState::Authorized(_))
    }

    pub fn authorized(&self) -> Option<&Authorized> {
        match &self.state {
            AuthState::Authorized(a) => Some(a),
            AuthState::Unauthorized { .. } => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.authorized().map(|a| &a.user)
    }
}
