//! Shared fixtures for unit tests: tokens, sealed cookies, a counting refresher.
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue, header};
use jsonwebtoken::{EncodingKey, Header};
use serde::Serialize;

use crate::services::auth::{
    AuthService, AuthSettings, AuthState, Authorized, CookieSettings, RefreshError, ResolvedAuth,
    Session, SessionCodec, SessionRefresher, User,
};

pub const COOKIE_PASSWORD: &str = "test-cookie-password-at-least-32-bytes";
// Far enough in the future to never expire during a test run, and fixed so
// repeated refreshes mint identical tokens.
const FUTURE_EXP: i64 = 4_102_444_800;
const PAST_EXP: i64 = 1_000_000_000;

#[derive(Debug, Clone, Copy)]
pub struct TokenSpec<'a> {
    pub sid: &'a str,
    pub exp: i64,
    pub org_id: Option<&'a str>,
    pub role: Option<&'a str>,
    pub permissions: &'a [&'a str],
}

impl TokenSpec<'static> {
    pub fn valid() -> Self {
        Self {
            sid: "session_01",
            exp: FUTURE_EXP,
            org_id: None,
            role: None,
            permissions: &[],
        }
    }

    pub fn expired() -> Self {
        Self {
            exp: PAST_EXP,
            ..Self::valid()
        }
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    sid: &'a str,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    org_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    permissions: &'a [&'a str],
}

/// HS256 token; the claims reader ignores signatures, so any key works.
pub fn access_token(spec: TokenSpec<'_>) -> String {
    let claims = Claims {
        sid: spec.sid,
        exp: spec.exp,
        org_id: spec.org_id,
        role: spec.role,
        permissions: spec.permissions,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"provider-test-key"),
    )
    .unwrap()
}

/// Same payload under an `RS256` header, the way identity providers sign.
pub fn rs256_headed(token: &str) -> String {
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6ImtleV8wMSJ9";
    let (_, rest) = token.split_once('.').unwrap();
    format!("{RS256_HEADER}.{rest}")
}

pub fn valid_token() -> String {
    access_token(TokenSpec::valid())
}

pub fn expired_token() -> String {
    access_token(TokenSpec::expired())
}

pub fn user() -> User {
    User {
        id: "user_01".into(),
        email: "ada@example.com".into(),
        email_verified: true,
        first_name: Some("Ada".into()),
        last_name: None,
        profile_picture_url: None,
    }
}

pub fn session(access_token: String) -> Session {
    Session {
        access_token,
        refresh_token: "refresh_01".into(),
        user: user(),
        impersonator: None,
    }
}

pub fn cookie_settings() -> CookieSettings {
    CookieSettings {
        name: "wos-session".into(),
        max_age_seconds: 3600,
        secure: false,
        domain: None,
    }
}

pub fn codec() -> SessionCodec {
    SessionCodec::new(COOKIE_PASSWORD, cookie_settings()).unwrap()
}

/// `name=value` pair for a request `Cookie` header.
pub fn cookie_pair(codec: &SessionCodec, session: &Session) -> String {
    let cookie = codec.seal(session).unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

pub fn session_headers(codec: &SessionCodec, access_token: String) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::COOKIE,
        HeaderValue::from_str(&cookie_pair(codec, &session(access_token))).unwrap(),
    );
    headers
}

pub fn is_clearing(value: &HeaderValue) -> bool {
    let value = value.to_str().unwrap();
    value.starts_with("wos-session=;") && value.contains("Max-Age=0")
}

pub fn settings() -> AuthSettings {
    AuthSettings {
        access_token_leeway_seconds: 60,
        sign_in_url: "/login".into(),
        logout_url: "https://auth.example.com/user_management/sessions/logout".into(),
        sign_out_return_to: "/".into(),
    }
}

pub fn auth_service(refresher: Arc<FakeRefresher>) -> Arc<AuthService> {
    Arc::new(AuthService::new(codec(), refresher, settings()))
}

pub fn authorized_auth() -> ResolvedAuth {
    ResolvedAuth {
        state: AuthState::Authorized(Authorized {
            user: user(),
            access_token: valid_token(),
            session_id: "session_01".into(),
            organization_id: None,
            role: None,
            permissions: Vec::new(),
            entitlements: Vec::new(),
            impersonator: None,
        }),
        refreshed: false,
        pending_cookie: None,
    }
}

/// In-memory refresher counting how often the provider would have been called.
#[derive(Debug, Default)]
pub struct FakeRefresher {
    fail: bool,
    calls: AtomicUsize,
    last_organization: Mutex<Option<String>>,
}

impl FakeRefresher {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_organization(&self) -> Option<String> {
        self.last_organization.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionRefresher for FakeRefresher {
    async fn refresh(
        &self,
        session: &Session,
        organization_id: Option<&str>,
    ) -> Result<Session, RefreshError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_organization.lock().unwrap() = organization_id.map(str::to_owned);

        if self.fail {
            return Err(RefreshError::Rejected {
                status: 400,
                message: "invalid_grant".into(),
            });
        }

        Ok(Session {
            access_token: rs256_headed(&access_token(TokenSpec {
                sid: "session_01",
                org_id: organization_id,
                ..TokenSpec::valid()
            })),
            refresh_token: "refresh_02".into(),
            user: session.user.clone(),
            impersonator: session.impersonator.clone(),
        })
    }
}
