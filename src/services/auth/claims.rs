use serde::Deserialize;
use std::{error::Error as StdError, fmt};

// Errors returned while reading access-token claims.
#[derive(Debug)]
pub enum ClaimsError {
    Jwt(jsonwebtoken::errors::Error),
    EmptyClaim(&'static str),
}

impl fmt::Display for ClaimsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(e) => write!(f, "access token decode failed: {}", e),
            Self::EmptyClaim(name) => write!(f, "empty '{}' claim", name),
        }
    }
}

impl StdError for ClaimsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for ClaimsError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

/// Access token claims issued by the identity provider.
///
/// NOTE:
/// - The token lives inside our sealed cookie, so only its structure and `exp`
///   matter here. Signature checks belong to whoever consumes the token downstream.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    pub sid: String,
    pub exp: i64,

    #[serde(default)]
    pub org_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
    #[serde(default)]
    pub entitlements: Option<Vec<String>>,
}

impl AccessTokenClaims {
    /// True once `now` is within `leeway_seconds` of `exp`.
    pub fn is_expired(&self, now: i64, leeway_seconds: i64) -> bool {
        self.exp.saturating_sub(leeway_seconds) <= now
    }
}

/// Reads claims out of provider-issued access tokens.
///
/// Any signing algorithm is accepted (providers sign with RS256 and rotate
/// keys); only the payload is decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsReader;

impl ClaimsReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, token: &str) -> Result<AccessTokenClaims, ClaimsError> {
        let data = jsonwebtoken::dangerous::insecure_decode::<AccessTokenClaims>(token)?;
        let claims = data.claims;

        if claims.sid.trim().is_empty() {
            return Err(ClaimsError::EmptyClaim("sid"));
        }
        if claims.exp == 0 {
            return Err(ClaimsError::EmptyClaim("exp"));
        }

        Ok(claims)
    }
}
