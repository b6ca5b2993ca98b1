use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::services::auth::refresh::store::{RefreshError, SessionRefresher};
use crate::services::auth::types::{Impersonator, Session, User};

const AUTHENTICATE_PATH: &str = "user_management/authenticate";

/// Identity-provider backed refresher (refresh_token grant over HTTPS).
#[derive(Clone)]
pub struct HttpSessionRefresher {
    client: reqwest::Client,
    endpoint: Url,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for HttpSessionRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print the client secret
        f.debug_struct("HttpSessionRefresher")
            .field("endpoint", &self.endpoint.as_str())
            .field("client_id", &self.client_id)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
    refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    organization_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    user: User,
    #[serde(default)]
    impersonator: Option<Impersonator>,
}

impl HttpSessionRefresher {
    pub fn new(
        api_base_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RefreshError> {
        let endpoint = authenticate_endpoint(api_base_url)?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }
}

fn authenticate_endpoint(api_base_url: &str) -> Result<Url, RefreshError> {
    // Url::join replaces the last segment unless the base ends with '/'
    let base = if api_base_url.ends_with('/') {
        api_base_url.to_string()
    } else {
        format!("{api_base_url}/")
    };

    Url::parse(&base)
        .and_then(|u| u.join(AUTHENTICATE_PATH))
        .map_err(|e| RefreshError::Transport(format!("invalid api base url: {e}")))
}

#[async_trait]
impl SessionRefresher for HttpSessionRefresher {
    async fn refresh(
        &self,
        session: &Session,
        organization_id: Option<&str>,
    ) -> Result<Session, RefreshError> {
        let body = RefreshRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            grant_type: "refresh_token",
            refresh_token: &session.refresh_token,
            organization_id,
        };

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let refreshed: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        Ok(Session {
            access_token: refreshed.access_token,
            refresh_token: refreshed.refresh_token,
            user: refreshed.user,
            impersonator: refreshed.impersonator,
        })
    }
}
