/*
 * Responsibility
 * - /me, /account, /legacy/me の response DTO
 * - access token / refresh token は出さない (Authorized 側で skip 済み)
 */
use serde::Serialize;

use crate::services::auth::{AuthState, Authorized, ResolvedAuth};

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub state: AuthState,
    pub refreshed: bool,
    /// `integrated` / `standalone` (legacy endpoints only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
}

impl SessionResponse {
    pub fn from_auth(auth: &ResolvedAuth) -> Self {
        Self {
            state: auth.state.clone(),
            refreshed: auth.refreshed,
            mode: None,
        }
    }

    pub fn with_mode(mut self, integrated: bool) -> Self {
        self.mode = Some(if integrated { "integrated" } else { "standalone" });
        self
    }
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub user_id: String,
    pub email: String,
    pub session_id: String,
    pub organization_id: Option<String>,
    pub role: Option<String>,
    pub permissions: Vec<String>,
    pub impersonated: bool,
}

impl From<Authorized> for AccountResponse {
    fn from(a: Authorized) -> Self {
        Self {
            user_id: a.user.id,
            email: a.user.email,
            session_id: a.session_id,
            organization_id: a.organization_id,
            role: a.role,
            permissions: a.permissions,
            impersonated: a.impersonator.is_some(),
        }
    }
}
