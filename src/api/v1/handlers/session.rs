/*
 * Responsibility
 * - session stage 配下の handler (/me, /account, /admin, /sign-out)
 * - 認証状態は extractor 経由で受け取るだけ (解決・cookie 書き込みは stage 側)
 */
use axum::{Json, extract::State, response::Response};

use crate::{
    api::v1::{
        dto::session::{AccountResponse, SessionResponse},
        extractors::auth_ctx::{Auth, CurrentScope, RequireAuth},
    },
    error::redirect_response,
    state::AppState,
};

pub async fn me(Auth(auth): Auth) -> Json<SessionResponse> {
    Json(SessionResponse::from_auth(&auth))
}

/// Behind `AccessPolicy::signed_in()`: anonymous callers never get here.
pub async fn account(RequireAuth(authorized): RequireAuth) -> Json<AccountResponse> {
    Json(AccountResponse::from(authorized))
}

/// Behind `AccessPolicy::deny_anonymous()`.
pub async fn admin(RequireAuth(authorized): RequireAuth) -> Json<AccountResponse> {
    Json(AccountResponse::from(authorized))
}

pub async fn sign_out(
    State(state): State<AppState>,
    CurrentScope(scope): CurrentScope,
    Auth(auth): Auth,
) -> Response {
    let out = state.auth.sign_out(&auth);

    // The clearing cookie below replaces whatever the stage would have committed.
    scope.supersede();

    tracing::info!(
        scope = scope.id(),
        user_id = auth.user().map(|u| u.id.as_str()),
        "signing out"
    );

    redirect_response(&out.location, out.clear_cookie)
}
