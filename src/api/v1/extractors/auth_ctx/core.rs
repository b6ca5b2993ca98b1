use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::middleware::auth::{
    get_auth,
    legacy::{self, LoaderOptions},
    require_auth, scope_of,
};
use crate::services::auth::{AuthError, ResolveOptions};
use crate::state::AppState;

use super::{Auth, CurrentScope, LegacyAction, LegacyLoader, RequireAuth};

/// Handler で、解決済みの ResolvedAuth を受け取るための extractor
/// session stage が RequestScope を request.extensions() に insert 済みである前提
/// 見つからない場合は 500 を返す（ミドルウェア未設定は設定ミス）
impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Auth(get_auth(&parts.extensions)?))
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequireAuth(require_auth(&parts.extensions)?))
    }
}

impl<S> FromRequestParts<S> for CurrentScope
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        scope_of(&parts.extensions)
            .map(CurrentScope)
            .ok_or_else(|| AuthError::MiddlewareNotRegistered.into())
    }
}

// stage の有無は legacy 側で判定する (どちらの構成でも使える)
impl FromRequestParts<AppState> for LegacyLoader {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let options = LoaderOptions {
            ensure_signed_in: true,
            ..LoaderOptions::default()
        };
        let auth = legacy::loader(parts, &state.auth, &options).await?;
        Ok(LegacyLoader(auth))
    }
}

impl FromRequestParts<AppState> for LegacyAction {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = legacy::action(parts, &state.auth, &ResolveOptions::default()).await;
        Ok(LegacyAction(auth))
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::middleware::auth::{StageOptions, register};
    use crate::test_support::{self, FakeRefresher};

    async fn strict(RequireAuth(authorized): RequireAuth) -> String {
        authorized.session_id
    }

    async fn read(Auth(auth): Auth) -> String {
        auth.is_authorized().to_string()
    }

    fn request(uri: &str, cookie: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn accessor_without_stage_is_server_error() {
        let res = Router::new()
            .route("/me", get(read))
            .oneshot(request("/me", None))
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn strict_accessor_denies_anonymous() {
        let auth = test_support::auth_service(FakeRefresher::succeeding());
        let app = register(auth, StageOptions::default())
            .apply(Router::new().route("/strict", get(strict)));

        let res = app.oneshot(request("/strict", None)).await.unwrap();

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn strict_accessor_returns_signed_in_caller() {
        let auth = test_support::auth_service(FakeRefresher::succeeding());
        let cookie = test_support::cookie_pair(
            auth.codec(),
            &test_support::session(test_support::valid_token()),
        );
        let app = register(auth, StageOptions::default())
            .apply(Router::new().route("/strict", get(strict)));

        let res = app.oneshot(request("/strict", Some(cookie))).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"session_01");
    }

    #[tokio::test]
    async fn legacy_loader_redirects_anonymous_without_stage() {
        let state = AppState::new(test_support::auth_service(FakeRefresher::succeeding()));
        let app = Router::new()
            .route(
                "/legacy",
                get(|LegacyLoader(_): LegacyLoader| async { "loaded" }),
            )
            .with_state(state);

        let res = app.oneshot(request("/legacy", None)).await.unwrap();

        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            res.headers()[header::LOCATION],
            "/login?return_to=%2Flegacy"
        );
    }
}
