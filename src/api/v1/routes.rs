/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health と /legacy/me は session stage の外、それ以外は stage の内側
 * - route 単位の AccessPolicy は route_layer (protect) で適用する
 */
use axum::{Router, routing::get};

use crate::middleware::auth::{AccessPolicy, SessionStage, access::protect};
use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    legacy::{legacy_me, legacy_touch},
    session::{account, admin, me, sign_out},
};

pub fn routes(state: &AppState, stage: &SessionStage) -> Router<AppState> {
    let account_routes = protect(
        Router::new().route("/account", get(account)),
        state.auth.clone(),
        AccessPolicy::signed_in(),
    );
    let admin_routes = protect(
        Router::new().route("/admin", get(admin)),
        state.auth.clone(),
        AccessPolicy::deny_anonymous(),
    );

    let staged = Router::new()
        .route("/me", get(me))
        .route("/sign-out", get(sign_out).post(sign_out))
        .merge(account_routes)
        .merge(admin_routes);

    Router::new()
        .route("/health", get(health))
        // 旧来 route: stage を通さず、互換入口が自前で解決する
        .route("/legacy/me", get(legacy_me).post(legacy_touch))
        .merge(stage.apply(staged))
}
