//! RequestScope: 1 リクエスト 1 回の解決結果キャッシュ + cookie commit
//!
//! - request.extensions() に Arc で入れる (プロセス共有の map には置かない)
//! - 解決結果は OnceCell で 1 回だけ書き込み、以降は読み取り専用
//! - pending cookie の書き込みは committed フラグで高々 1 回

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use axum::{
    http::{Extensions, HeaderMap, header},
    response::Response,
};
use tokio::sync::OnceCell;
use tracing::Instrument;
use uuid::Uuid;

use crate::middleware::http::REQUEST_ID_HEADER;
use crate::services::auth::{AuthError, AuthService, Authorized, ResolveOptions, ResolvedAuth};

tokio::task_local! {
    static CURRENT_SCOPE: Arc<RequestScope>;
}

#[derive(Debug)]
pub struct RequestScope {
    id: String,
    auth: OnceCell<Arc<ResolvedAuth>>,
    committed: AtomicBool,
}

impl RequestScope {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            auth: OnceCell::new(),
            committed: AtomicBool::new(false),
        }
    }

    /// Scope id: the `x-request-id` header when present, else a fresh uuid.
    pub fn for_headers(headers: &HeaderMap) -> Self {
        let id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Self::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Resolved value, if resolution already happened.
    pub fn auth(&self) -> Option<Arc<ResolvedAuth>> {
        self.auth.get().cloned()
    }

    /// Return the cached value or run `compute` exactly once.
    ///
    /// Concurrent first callers wait on the same initialization. If the
    /// computing future is dropped the cell stays empty.
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> Arc<ResolvedAuth>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolvedAuth>,
    {
        self.auth
            .get_or_init(|| async move { Arc::new(compute().await) })
            .await
            .clone()
    }

    pub async fn get_or_resolve(
        &self,
        auth: &AuthService,
        headers: &HeaderMap,
        options: &ResolveOptions,
    ) -> Arc<ResolvedAuth> {
        // Events logged while resolving (refresh, invalid cookie) carry the scope id.
        self.get_or_compute(|| {
            auth.resolve(headers, options)
                .instrument(tracing::info_span!("resolve_session", scope = %self.id))
        })
        .await
    }

    /// Append the pending cookie to `response` unless it was already committed.
    ///
    /// Returns true when a header was written.
    pub fn commit(&self, response: &mut Response) -> bool {
        let Some(auth) = self.auth.get() else {
            return false;
        };
        let Some(cookie) = &auth.pending_cookie else {
            return false;
        };
        if self.committed.swap(true, Ordering::AcqRel) {
            return false;
        }

        response
            .headers_mut()
            .append(header::SET_COOKIE, cookie.clone());
        tracing::debug!(scope = %self.id, refreshed = auth.refreshed, "session cookie committed");
        true
    }

    /// Stop any pending cookie from being committed (the response already
    /// decided the cookie's fate, e.g. sign-out).
    pub fn supersede(&self) {
        self.committed.store(true, Ordering::Release);
    }

    /// Run `fut` with this scope visible to `current_auth`.
    pub async fn enter<F: Future>(self: &Arc<Self>, fut: F) -> F::Output {
        CURRENT_SCOPE.scope(self.clone(), fut).await
    }
}

/// Scope attached to a request, if the session stage ran.
pub fn scope_of(extensions: &Extensions) -> Option<Arc<RequestScope>> {
    extensions.get::<Arc<RequestScope>>().cloned()
}

/// Read accessor: the resolved auth for this request.
pub fn get_auth(extensions: &Extensions) -> Result<Arc<ResolvedAuth>, AuthError> {
    scope_of(extensions)
        .and_then(|scope| scope.auth())
        .ok_or(AuthError::MiddlewareNotRegistered)
}

/// Strict accessor: the signed-in caller, or `Denied` when there is none.
pub fn require_auth(extensions: &Extensions) -> Result<Authorized, AuthError> {
    get_auth(extensions)?
        .authorized()
        .cloned()
        .ok_or(AuthError::Denied)
}

/// Zero-argument accessor for code running inside the session stage.
///
/// Only works on the task that runs the handler; spawned tasks must be handed
/// the value explicitly.
pub fn current_auth() -> Result<Arc<ResolvedAuth>, AuthError> {
    CURRENT_SCOPE
        .try_with(|scope| scope.auth())
        .ok()
        .flatten()
        .ok_or(AuthError::MiddlewareNotRegistered)
}
