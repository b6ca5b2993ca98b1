/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, APP_ENV, Auth / Cookie 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動後は読み取り専用 (リクエスト間で共有されるのはここだけ)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::middleware::auth::OnUnauthenticated;
use crate::services::auth::codec::MIN_PASSWORD_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub auth_client_id: String,
    pub auth_api_key: String,
    pub auth_api_base_url: String,
    pub auth_refresh_timeout_seconds: u64,

    pub cookie_password: String,
    pub cookie_name: String,
    pub cookie_max_age_seconds: i64,
    pub cookie_domain: Option<String>,

    pub sign_in_url: String,
    pub sign_out_return_to: String,
    pub access_token_leeway_seconds: i64,

    pub ensure_signed_in: bool,
    pub on_unauthenticated: OnUnauthenticated,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print secrets
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("auth_client_id", &self.auth_client_id)
            .field("auth_api_base_url", &self.auth_api_base_url)
            .field("cookie_name", &self.cookie_name)
            .field("sign_in_url", &self.sign_in_url)
            .field("ensure_signed_in", &self.ensure_signed_in)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port: u16 = get("PORT").and_then(|s| s.parse().ok()).unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(&get("APP_ENV").unwrap_or_else(|| "development".to_string()));

        let auth_client_id = get("AUTH_CLIENT_ID").ok_or(ConfigError::Missing("AUTH_CLIENT_ID"))?;

        let auth_api_key = get("AUTH_API_KEY").ok_or(ConfigError::Missing("AUTH_API_KEY"))?;

        let auth_api_base_url = get("AUTH_API_BASE_URL")
            .unwrap_or_else(|| "https://api.workos.com".to_string())
            .trim_end_matches('/')
            .to_string();
        if url::Url::parse(&auth_api_base_url).is_err() {
            return Err(ConfigError::Invalid("AUTH_API_BASE_URL"));
        }

        let auth_refresh_timeout_seconds = get("AUTH_REFRESH_TIMEOUT_SECONDS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10);

        let cookie_password =
            get("AUTH_COOKIE_PASSWORD").ok_or(ConfigError::Missing("AUTH_COOKIE_PASSWORD"))?;
        if cookie_password.len() < MIN_PASSWORD_LEN {
            return Err(ConfigError::Invalid("AUTH_COOKIE_PASSWORD"));
        }

        let cookie_name = get("AUTH_COOKIE_NAME").unwrap_or_else(|| "wos-session".to_string());
        if cookie_name.is_empty() || cookie_name.contains([';', '=', ' ', ',']) {
            return Err(ConfigError::Invalid("AUTH_COOKIE_NAME"));
        }

        // 400 days: the longest lifetime browsers accept.
        let cookie_max_age_seconds = get("AUTH_COOKIE_MAX_AGE_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60 * 60 * 24 * 400);

        let cookie_domain = get("AUTH_COOKIE_DOMAIN").filter(|d| !d.trim().is_empty());

        let sign_in_url = get("AUTH_SIGN_IN_URL").unwrap_or_else(|| "/login".to_string());

        let sign_out_return_to = get("AUTH_SIGN_OUT_RETURN_TO").unwrap_or_else(|| "/".to_string());

        let access_token_leeway_seconds = get("ACCESS_TOKEN_LEEWAY_SECONDS")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(60);

        let ensure_signed_in = get("AUTH_ENSURE_SIGNED_IN")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let on_unauthenticated = match get("AUTH_ON_UNAUTHENTICATED") {
            Some(v) => v
                .parse::<OnUnauthenticated>()
                .map_err(|_| ConfigError::Invalid("AUTH_ON_UNAUTHENTICATED"))?,
            None => OnUnauthenticated::default(),
        };

        Ok(Self {
            addr,
            app_env,
            auth_client_id,
            auth_api_key,
            auth_api_base_url,
            auth_refresh_timeout_seconds,
            cookie_password,
            cookie_name,
            cookie_max_age_seconds,
            cookie_domain,
            sign_in_url,
            sign_out_return_to,
            access_token_leeway_seconds,
            ensure_signed_in,
            on_unauthenticated,
        })
    }

    pub fn logout_url(&self) -> String {
        format!("{}/user_management/sessions/logout", self.auth_api_base_url)
    }
}
