//! route 単位の access gate (AccessPolicy)
//!
//! - stage が解決済みの値を読むだけで、自分では解決しない
//! - 未認証なら redirect / deny (AuthError) を返し、handler は実行されない

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{Extensions, Request, Uri},
    middleware::{self, Next},
    response::Response,
};
use crate::error::AppError;
use crate::middleware::auth::scope::get_auth;
use crate::services::auth::{AuthError, AuthService, ResolvedAuth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnUnauthenticated {
    #[default]
    Redirect,
    Deny,
}

impl std::str::FromStr for OnUnauthenticated {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redirect" => Ok(Self::Redirect),
            "deny" => Ok(Self::Deny),
            _ => Err(()),
        }
    }
}

/// Route-level authentication requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AccessPolicy {
    pub require_authenticated: bool,
    pub on_unauthenticated: OnUnauthenticated,
}

impl AccessPolicy {
    /// Signed-in callers only; everyone else is sent to sign in.
    pub const fn signed_in() -> Self {
        Self {
            require_authenticated: true,
            on_unauthenticated: OnUnauthenticated::Redirect,
        }
    }

    /// Signed-in callers only; everyone else gets 401.
    pub const fn deny_anonymous() -> Self {
        Self {
            require_authenticated: true,
            on_unauthenticated: OnUnauthenticated::Deny,
        }
    }
}

/// Check `auth` against `policy`.
///
/// `sign_in` is only evaluated when a redirect is actually produced.
pub fn enforce(
    auth: &ResolvedAuth,
    policy: &AccessPolicy,
    sign_in: impl FnOnce() -> String,
) -> Result<(), AuthError> {
    if !policy.require_authenticated || auth.is_authorized() {
        return Ok(());
    }

    match policy.on_unauthenticated {
        OnUnauthenticated::Redirect => {
            let location = sign_in();
            tracing::debug!(location = %location, "unauthenticated; redirecting to sign-in");
            Err(AuthError::redirect(location))
        }
        OnUnauthenticated::Deny => {
            tracing::debug!("unauthenticated; denying");
            Err(AuthError::Denied)
        }
    }
}

#[derive(Debug, Clone)]
struct AccessGate {
    auth: Arc<AuthService>,
    policy: AccessPolicy,
}

/// Put `policy` in front of every route of `router`.
///
/// Uses `route_layer`, so unmatched paths still 404 instead of redirecting.
/// The session stage must wrap the router from the outside.
///
/// 例：
/// ```ignore
/// let account = Router::new().route("/account", get(account));
/// let account = middleware::auth::access::protect(account, auth.clone(), AccessPolicy::signed_in());
/// ```
pub fn protect<S>(router: Router<S>, auth: Arc<AuthService>, policy: AccessPolicy) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(
        AccessGate { auth, policy },
        access_middleware,
    ))
}

async fn access_middleware(
    State(gate): State<AccessGate>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth = get_auth(req.extensions())?;

    enforce(&auth, &gate.policy, || {
        gate.auth
            .sign_in_location(&return_path(req.extensions(), req.uri()))
    })?;

    Ok(next.run(req).await)
}

/// Path (and query) of the original request, before any `nest` stripping.
pub(crate) fn return_path(extensions: &Extensions, uri: &Uri) -> String {
    let uri = extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(uri);

    uri.path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned())
}
