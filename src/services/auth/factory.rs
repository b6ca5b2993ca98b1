/// Factory: build `AuthService` from application `Config`.
use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::config::Config;
use crate::services::auth::{
    AuthService, AuthSettings, CookieSettings, SessionCodec, codec::CodecError,
    refresh::{HttpSessionRefresher, RefreshError},
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("session cookie codec: {0}")]
    Codec(#[from] CodecError),
    #[error("session refresher: {0}")]
    Refresher(#[from] RefreshError),
}

pub fn build_auth_service(config: &Config) -> Result<Arc<AuthService>, BuildError> {
    let codec = SessionCodec::new(
        &config.cookie_password,
        CookieSettings {
            name: config.cookie_name.clone(),
            max_age_seconds: config.cookie_max_age_seconds,
            // ローカル開発 (http://localhost) では Secure を外す
            secure: config.app_env.is_production(),
            domain: config.cookie_domain.clone(),
        },
    )?;

    let refresher = HttpSessionRefresher::new(
        &config.auth_api_base_url,
        config.auth_client_id.clone(),
        config.auth_api_key.clone(),
        Duration::from_secs(config.auth_refresh_timeout_seconds),
    )?;

    let settings = AuthSettings {
        access_token_leeway_seconds: config.access_token_leeway_seconds,
        sign_in_url: config.sign_in_url.clone(),
        logout_url: config.logout_url(),
        sign_out_return_to: config.sign_out_return_to.clone(),
    };

    Ok(Arc::new(AuthService::new(
        codec,
        Arc::new(refresher),
        settings,
    )))
}
