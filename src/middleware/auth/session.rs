//! session stage: 解決 → handler 実行 → cookie commit
//!
//! Responsibility:
//! - RequestScope を request に付与 (外側の stage が付けたものは再利用)
//! - handler より前にセッションを解決する
//! - ensure_signed_in なら stage 配下すべてでサインインを要求
//! - 戻ってきた response (gate の redirect 含む) に Set-Cookie を 1 回だけ追加

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::middleware::auth::{
    access::{self, AccessPolicy, OnUnauthenticated},
    scope::{RequestScope, scope_of},
};
use crate::services::auth::{AuthService, ResolveOptions, ResolvedAuth};

#[derive(Debug, Clone, Default)]
pub struct StageOptions {
    /// Require a signed-in caller for every route under the stage.
    pub ensure_signed_in: bool,
    pub on_unauthenticated: OnUnauthenticated,
    pub hooks: ResolveOptions,
}

/// A registered session stage.
///
/// Handlers read its result through `scope::get_auth` / `scope::current_auth`
/// or the `Auth` / `RequireAuth` extractors.
#[derive(Debug, Clone)]
pub struct SessionStage {
    auth: Arc<AuthService>,
    options: Arc<StageOptions>,
}

pub fn register(auth: Arc<AuthService>, options: StageOptions) -> SessionStage {
    SessionStage {
        auth,
        options: Arc::new(options),
    }
}

impl SessionStage {
    /// Wrap every route of `router` (applied with `layer`, so it runs before routing).
    ///
    /// 例：
    /// ```ignore
    /// let stage = middleware::auth::session::register(auth.clone(), StageOptions::default());
    /// let app = stage.apply(api::v1::routes(state.clone()));
    /// ```
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self.clone(), session_middleware))
    }

    fn gate(&self, auth: &ResolvedAuth, req: &Request<Body>) -> Result<(), AppError> {
        if !self.options.ensure_signed_in {
            return Ok(());
        }

        let policy = AccessPolicy {
            require_authenticated: true,
            on_unauthenticated: self.options.on_unauthenticated,
        };

        access::enforce(auth, &policy, || {
            self.auth
                .sign_in_location(&access::return_path(req.extensions(), req.uri()))
        })?;
        Ok(())
    }
}

async fn session_middleware(
    State(stage): State<SessionStage>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    // Nested stages share the scope of the outermost one.
    let scope = match scope_of(req.extensions()) {
        Some(scope) => scope,
        None => {
            let scope = Arc::new(RequestScope::for_headers(req.headers()));
            req.extensions_mut().insert(scope.clone());
            scope
        }
    };

    let auth = scope
        .get_or_resolve(&stage.auth, req.headers(), &stage.options.hooks)
        .await;

    let mut response = match stage.gate(&auth, &req) {
        Ok(()) => scope.enter(next.run(req)).await,
        Err(err) => err.into_response(),
    };

    scope.commit(&mut response);
    response
}
