/*
 * Responsibility
 * - Session を JSON にして private cookie (暗号化 + 改ざん検知) に封入する
 * - Cookie header から取り出す / 削除用 cookie を作る
 * - response には触らない (header value を返すだけ)
 */
use axum::http::{HeaderMap, HeaderValue, header};
use cookie::{Cookie, CookieJar, Key, SameSite, time::Duration};

use crate::services::auth::types::Session;

/// Minimum length of the cookie password (key material is derived from it).
pub const MIN_PASSWORD_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cookie password must be at least {MIN_PASSWORD_LEN} bytes")]
    WeakPassword,
    #[error("session serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("sealed cookie missing from jar")]
    Seal,
    #[error("invalid set-cookie header value")]
    Header(#[from] header::InvalidHeaderValue),
}

/// Cookie attributes shared by the session cookie and its clearing cookie.
#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub name: String,
    pub max_age_seconds: i64,
    pub secure: bool,
    pub domain: Option<String>,
}

/// Outcome of reading the session cookie from request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedCookie {
    Absent,
    // Present but unreadable: tampered, sealed with another key, or not a session.
    Invalid,
    Present(Session),
}

pub struct SessionCodec {
    key: Key,
    settings: CookieSettings,
}

impl std::fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SessionCodec")
            .field("settings", &self.settings)
            .finish()
    }
}

impl SessionCodec {
    pub fn new(password: &str, settings: CookieSettings) -> Result<Self, CodecError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(CodecError::WeakPassword);
        }

        Ok(Self {
            key: Key::derive_from(password.as_bytes()),
            settings,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.settings.name
    }

    pub fn decode(&self, headers: &HeaderMap) -> DecodedCookie {
        let raw = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|s| Cookie::split_parse(s))
            .filter_map(Result::ok)
            .find(|c| c.name() == self.settings.name);

        let Some(raw) = raw else {
            return DecodedCookie::Absent;
        };

        let mut jar = CookieJar::new();
        jar.add_original(raw.into_owned());

        let Some(opened) = jar.private(&self.key).get(&self.settings.name) else {
            return DecodedCookie::Invalid;
        };

        match serde_json::from_str::<Session>(opened.value()) {
            Ok(session) => DecodedCookie::Present(session),
            Err(_) => DecodedCookie::Invalid,
        }
    }

    /// Seal `session` into a cookie carrying all attributes.
    pub fn seal(&self, session: &Session) -> Result<Cookie<'static>, CodecError> {
        let value = serde_json::to_string(session)?;

        let mut jar = CookieJar::new();
        jar.private_mut(&self.key).add(self.build(value));

        jar.get(&self.settings.name)
            .cloned()
            .ok_or(CodecError::Seal)
    }

    /// `Set-Cookie` value carrying the sealed session.
    pub fn encode(&self, session: &Session) -> Result<HeaderValue, CodecError> {
        let cookie = self.seal(session)?;
        Ok(HeaderValue::from_str(&cookie.to_string())?)
    }

    /// `Set-Cookie` value that makes the client drop the session.
    pub fn clear(&self) -> Result<HeaderValue, CodecError> {
        let mut cookie = self.build(String::new());
        cookie.make_removal();
        Ok(HeaderValue::from_str(&cookie.to_string())?)
    }

    fn build(&self, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((self.settings.name.clone(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.settings.secure)
            .max_age(Duration::seconds(self.settings.max_age_seconds));

        if let Some(domain) = &self.settings.domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}
