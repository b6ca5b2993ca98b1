//! loader / action 互換入口 (session stage なしでも動く)
//!
//! - RequestScope があれば stage 済み: キャッシュをそのまま返す (cookie は stage が commit)
//! - 無ければその場で解決し、pending cookie を handler 側に返す
//! - stage なしの呼び出しはメモ化しない (呼ぶたびに解決)

use std::{convert::Infallible, sync::Arc};

use axum::{
    http::{Extensions, HeaderMap, HeaderValue, header, request::Parts},
    response::{IntoResponseParts, ResponseParts},
};

use crate::middleware::auth::{access, scope::scope_of};
use crate::services::auth::{AuthError, AuthService, ResolveOptions, ResolvedAuth};

#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    pub ensure_signed_in: bool,
    pub hooks: ResolveOptions,
}

/// Auth state plus the cookie a standalone resolution still has to send.
#[derive(Debug, Clone)]
pub struct LegacyAuth {
    pub auth: Arc<ResolvedAuth>,
    integrated: bool,
    set_cookie: Option<HeaderValue>,
}

impl LegacyAuth {
    /// True when the session stage owns the cookie for this request.
    pub fn is_integrated(&self) -> bool {
        self.integrated
    }

    pub fn split(self) -> (Arc<ResolvedAuth>, SetSessionCookie) {
        (self.auth, SetSessionCookie(self.set_cookie))
    }
}

/// Response part appending the session cookie (if any) to the handler's response.
#[derive(Debug, Clone, Default)]
pub struct SetSessionCookie(Option<HeaderValue>);

impl IntoResponseParts for SetSessionCookie {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if let Some(cookie) = self.0 {
            res.headers_mut().append(header::SET_COOKIE, cookie);
        }
        Ok(res)
    }
}

/// Loader-style entry point (reads), optionally requiring a signed-in caller.
pub async fn loader(
    parts: &Parts,
    auth: &AuthService,
    options: &LoaderOptions,
) -> Result<LegacyAuth, AuthError> {
    let legacy = resolve(&parts.extensions, &parts.headers, auth, &options.hooks).await;

    if options.ensure_signed_in && !legacy.auth.is_authorized() {
        let location =
            auth.sign_in_location(&access::return_path(&parts.extensions, &parts.uri));
        return Err(AuthError::Redirect {
            location,
            set_cookie: legacy.set_cookie,
        });
    }

    Ok(legacy)
}

/// Action-style entry point (mutations): never redirects.
pub async fn action(parts: &Parts, auth: &AuthService, hooks: &ResolveOptions) -> LegacyAuth {
    resolve(&parts.extensions, &parts.headers, auth, hooks).await
}

async fn resolve(
    extensions: &Extensions,
    headers: &HeaderMap,
    auth: &AuthService,
    hooks: &ResolveOptions,
) -> LegacyAuth {
    match scope_of(extensions) {
        Some(scope) => LegacyAuth {
            auth: scope.get_or_resolve(auth, headers, hooks).await,
            integrated: true,
            set_cookie: None,
        },
        None => {
            tracing::debug!("session stage not installed; resolving standalone");
            let resolved = Arc::new(auth.resolve(headers, hooks).await);
            let set_cookie = resolved.pending_cookie.clone();
            LegacyAuth {
                auth: resolved,
                integrated: false,
                set_cookie,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::IntoResponse,
    };

    use super::*;
    use crate::middleware::auth::scope::RequestScope;
    use crate::test_support::{self, FakeRefresher};

    fn parts_with_cookie(cookie: Option<String>) -> Parts {
        let mut builder = Request::builder().uri("/legacy?x=1");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn integrated_mode_returns_cached_value_without_cookie() {
        let refresher = FakeRefresher::succeeding();
        let auth = test_support::auth_service(refresher.clone());
        let cookie = test_support::cookie_pair(
            auth.codec(),
            &test_support::session(test_support::expired_token()),
        );
        let mut parts = parts_with_cookie(Some(cookie));

        let scope = Arc::new(RequestScope::new("req"));
        let integrated = scope
            .get_or_resolve(&auth, &parts.headers, &ResolveOptions::default())
            .await;
        parts.extensions.insert(scope);

        let loaded = loader(&parts, &auth, &LoaderOptions::default()).await.unwrap();
        let acted = action(&parts, &auth, &ResolveOptions::default()).await;

        assert!(Arc::ptr_eq(&loaded.auth, &integrated));
        assert!(Arc::ptr_eq(&acted.auth, &integrated));
        assert!(loaded.is_integrated());
        assert_eq!(refresher.calls(), 1);

        let (_, cookie) = loaded.split();
        let res = (cookie, "ok").into_response();
        assert!(res.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn standalone_mode_resolves_and_returns_cookie() {
        let refresher = FakeRefresher::succeeding();
        let auth = test_support::auth_service(refresher.clone());
        let cookie = test_support::cookie_pair(
            auth.codec(),
            &test_support::session(test_support::expired_token()),
        );
        let parts = parts_with_cookie(Some(cookie));

        let first = action(&parts, &auth, &ResolveOptions::default()).await;
        let second = action(&parts, &auth, &ResolveOptions::default()).await;

        assert!(first.auth.refreshed);
        assert!(!first.is_integrated());
        // No memoization outside the stage.
        assert_eq!(refresher.calls(), 2);
        assert_eq!(first.auth.state, second.auth.state);

        let (_, cookie) = first.split();
        let res = (cookie, "ok").into_response();
        assert_eq!(res.headers().get_all(header::SET_COOKIE).iter().count(), 1);
    }

    #[tokio::test]
    async fn both_modes_produce_same_state() {
        let auth = test_support::auth_service(FakeRefresher::succeeding());
        let cookie = test_support::cookie_pair(
            auth.codec(),
            &test_support::session(test_support::valid_token()),
        );

        let standalone = action(
            &parts_with_cookie(Some(cookie.clone())),
            &auth,
            &ResolveOptions::default(),
        )
        .await;

        let mut parts = parts_with_cookie(Some(cookie));
        let scope = Arc::new(RequestScope::new("req"));
        scope
            .get_or_resolve(&auth, &parts.headers, &ResolveOptions::default())
            .await;
        parts.extensions.insert(scope);
        let integrated = action(&parts, &auth, &ResolveOptions::default()).await;

        assert_eq!(standalone.auth.state, integrated.auth.state);
    }

    #[tokio::test]
    async fn loader_redirect_keeps_clearing_cookie_when_standalone() {
        let auth = test_support::auth_service(FakeRefresher::failing());
        let cookie = test_support::cookie_pair(
            auth.codec(),
            &test_support::session(test_support::expired_token()),
        );
        let parts = parts_with_cookie(Some(cookie));
        let options = LoaderOptions {
            ensure_signed_in: true,
            ..LoaderOptions::default()
        };

        let err = loader(&parts, &auth, &options).await.unwrap_err();

        let AuthError::Redirect {
            location,
            set_cookie,
        } = err.clone()
        else {
            panic!("expected redirect, got {err:?}");
        };
        assert_eq!(location, "/login?return_to=%2Flegacy%3Fx%3D1");
        assert!(test_support::is_clearing(set_cookie.as_ref().unwrap()));

        let res = crate::error::AppError::from(err).into_response();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn anonymous_loader_without_requirement_passes() {
        let auth = test_support::auth_service(FakeRefresher::succeeding());
        let legacy = loader(&parts_with_cookie(None), &auth, &LoaderOptions::default())
            .await
            .unwrap();

        assert!(!legacy.auth.is_authorized());
        assert!(!legacy.is_integrated());
        let (_, cookie) = legacy.split();
        assert!((cookie, "ok").into_response().headers().get(header::SET_COOKIE).is_none());
    }
}
