/*
 * Responsibility
 * - cookie → ResolvedAuth の解決 (期限切れなら refresh)
 * - refresh hook の通知 (best-effort)
 * - sign-in / sign-out の URL 組み立て
 *
 * Notes
 * - request header を読むだけで response には書かない (cookie は stage / legacy 側)
 */
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use axum::http::{HeaderMap, HeaderValue};
use url::form_urlencoded;

use crate::services::auth::{
    claims::{AccessTokenClaims, ClaimsReader},
    codec::{DecodedCookie, SessionCodec},
    refresh::{RefreshError, SessionRefresher},
    types::{AuthState, Authorized, ResolvedAuth, Session, UnauthorizedReason},
};

pub type RefreshHook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Best-effort notifications fired while resolving.
///
/// Each fires at most once per resolution, synchronously. A panicking hook is
/// logged and ignored; it never changes the resolved result.
#[derive(Clone, Default)]
pub struct ResolveOptions {
    pub on_refresh_success: Option<RefreshHook<Authorized>>,
    pub on_refresh_error: Option<RefreshHook<RefreshError>>,
}

impl fmt::Debug for ResolveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveOptions")
            .field("on_refresh_success", &self.on_refresh_success.is_some())
            .field("on_refresh_error", &self.on_refresh_error.is_some())
            .finish()
    }
}

impl ResolveOptions {
    pub fn on_refresh_success(mut self, hook: impl Fn(&Authorized) + Send + Sync + 'static) -> Self {
        self.on_refresh_success = Some(Arc::new(hook));
        self
    }

    pub fn on_refresh_error(
        mut self,
        hook: impl Fn(&RefreshError) + Send + Sync + 'static,
    ) -> Self {
        self.on_refresh_error = Some(Arc::new(hook));
        self
    }
}

/// Where callers are sent to sign in and out.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub access_token_leeway_seconds: i64,
    pub sign_in_url: String,
    pub logout_url: String,
    pub sign_out_return_to: String,
}

/// Result of signing out: where to go and the cookie that drops the session.
#[derive(Debug, Clone)]
pub struct SignOut {
    pub location: String,
    pub clear_cookie: Option<HeaderValue>,
}

pub struct AuthService {
    codec: SessionCodec,
    refresher: Arc<dyn SessionRefresher>,
    claims: ClaimsReader,
    settings: AuthSettings,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("codec", &self.codec)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AuthService {
    pub fn new(
        codec: SessionCodec,
        refresher: Arc<dyn SessionRefresher>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            codec,
            refresher,
            claims: ClaimsReader::new(),
            settings,
        }
    }

    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    /// Resolve the caller's auth state from request headers.
    ///
    /// Never fails: missing, unreadable and unrefreshable sessions all come back
    /// as `Unauthorized`.
    pub async fn resolve(&self, headers: &HeaderMap, options: &ResolveOptions) -> ResolvedAuth {
        self.resolve_at(headers, options, chrono::Utc::now().timestamp())
            .await
    }

    pub async fn resolve_at(
        &self,
        headers: &HeaderMap,
        options: &ResolveOptions,
        now: i64,
    ) -> ResolvedAuth {
        let session = match self.codec.decode(headers) {
            DecodedCookie::Absent => {
                return ResolvedAuth::unauthorized(UnauthorizedReason::NoSession);
            }
            DecodedCookie::Invalid => {
                tracing::warn!(
                    cookie = self.codec.cookie_name(),
                    "session cookie could not be decoded; clearing it"
                );
                return ResolvedAuth {
                    state: AuthState::Unauthorized {
                        reason: UnauthorizedReason::NoSession,
                    },
                    refreshed: false,
                    pending_cookie: self.clear_cookie(),
                };
            }
            DecodedCookie::Present(session) => session,
        };

        let claims = match self.claims.read(&session.access_token) {
            Ok(claims) if !claims.is_expired(now, self.settings.access_token_leeway_seconds) => {
                return ResolvedAuth {
                    state: AuthState::Authorized(authorized(session, claims)),
                    refreshed: false,
                    pending_cookie: None,
                };
            }
            Ok(claims) => {
                tracing::debug!(user_id = %session.user.id, "access token expired; refreshing");
                Some(claims)
            }
            Err(err) => {
                tracing::debug!(error = %err, "access token unreadable; refreshing");
                None
            }
        };

        let organization_id = claims.as_ref().and_then(|c| c.org_id.as_deref());

        match self.refresh(&session, organization_id).await {
            Ok((authorized, cookie)) => {
                tracing::info!(
                    user_id = %authorized.user.id,
                    session_id = %authorized.session_id,
                    "session refreshed"
                );
                notify(
                    options.on_refresh_success.as_ref(),
                    &authorized,
                    "on_refresh_success",
                );

                ResolvedAuth {
                    state: AuthState::Authorized(authorized),
                    refreshed: true,
                    pending_cookie: Some(cookie),
                }
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    user_id = %session.user.id,
                    "session refresh failed"
                );
                notify(options.on_refresh_error.as_ref(), &err, "on_refresh_error");

                ResolvedAuth {
                    state: AuthState::Unauthorized {
                        reason: UnauthorizedReason::RefreshFailed,
                    },
                    refreshed: false,
                    pending_cookie: self.clear_cookie(),
                }
            }
        }
    }

    async fn refresh(
        &self,
        session: &Session,
        organization_id: Option<&str>,
    ) -> Result<(Authorized, HeaderValue), RefreshError> {
        let rotated = self.refresher.refresh(session, organization_id).await?;

        let claims = self
            .claims
            .read(&rotated.access_token)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        let cookie = self
            .codec
            .encode(&rotated)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        Ok((authorized(rotated, claims), cookie))
    }

    fn clear_cookie(&self) -> Option<HeaderValue> {
        match self.codec.clear() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(error = %err, "failed to build clearing cookie");
                None
            }
        }
    }

    /// Sign-in location carrying the path to come back to.
    pub fn sign_in_location(&self, return_to: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("return_to", return_to)
            .finish();

        append_query(&self.settings.sign_in_url, &query)
    }

    pub fn sign_out(&self, auth: &ResolvedAuth) -> SignOut {
        let return_to = &self.settings.sign_out_return_to;

        let location = match auth.authorized() {
            Some(authorized) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("session_id", &authorized.session_id)
                    .append_pair("return_to", return_to)
                    .finish();
                append_query(&self.settings.logout_url, &query)
            }
            None => return_to.clone(),
        };

        SignOut {
            location,
            clear_cookie: self.clear_cookie(),
        }
    }
}

fn authorized(session: Session, claims: AccessTokenClaims) -> Authorized {
    Authorized {
        user: session.user,
        access_token: session.access_token,
        session_id: claims.sid,
        organization_id: claims.org_id,
        role: claims.role,
        permissions: claims.permissions.unwrap_or_default(),
        entitlements: claims.entitlements.unwrap_or_default(),
        impersonator: session.impersonator,
    }
}

fn append_query(base: &str, query: &str) -> String {
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{base}{sep}{query}")
}

fn notify<T>(hook: Option<&RefreshHook<T>>, value: &T, name: &'static str) {
    let Some(hook) = hook else {
        return;
    };

    if catch_unwind(AssertUnwindSafe(|| hook(value))).is_err() {
        tracing::warn!(hook = name, "refresh hook panicked; ignored");
    }
}
