use async_trait::async_trait;

use crate::services::auth::types::Session;

/// Refresh failures. Every variant ends the request as `refresh-failed`;
/// nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    // The provider answered and said no (revoked / expired refresh token).
    #[error("refresh rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("refresh transport error: {0}")]
    Transport(String),

    #[error("refresh response invalid: {0}")]
    InvalidResponse(String),
}

/// Exchanges the credentials of an expiring session for fresh ones.
///
/// Implementations must not touch cookies or responses; they only talk to the
/// identity provider.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    // Returns the rotated session.
    //
    // `organization_id` keeps the refreshed token scoped to the same organization.
    async fn refresh(
        &self,
        session: &Session,
        organization_id: Option<&str>,
    ) -> Result<Session, RefreshError>;
}
