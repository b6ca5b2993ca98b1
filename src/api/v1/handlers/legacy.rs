/*
 * Responsibility
 * - session stage を通らない旧来 route (/legacy/me)
 * - loader (GET) / action (POST) の互換入口を使い、cookie は自分の response に載せる
 */
use axum::{Json, response::IntoResponse};

use crate::api::v1::{
    dto::session::SessionResponse,
    extractors::auth_ctx::{LegacyAction, LegacyLoader},
};

pub async fn legacy_me(LegacyLoader(legacy): LegacyLoader) -> impl IntoResponse {
    let integrated = legacy.is_integrated();
    let (auth, set_cookie) = legacy.split();

    (
        set_cookie,
        Json(SessionResponse::from_auth(&auth).with_mode(integrated)),
    )
}

pub async fn legacy_touch(LegacyAction(legacy): LegacyAction) -> impl IntoResponse {
    let integrated = legacy.is_integrated();
    let (auth, set_cookie) = legacy.split();

    (
        set_cookie,
        Json(SessionResponse::from_auth(&auth).with_mode(integrated)),
    )
}
