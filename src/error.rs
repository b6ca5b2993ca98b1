/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body, redirect)
 * - AuthError を統一的に変換 (redirect / deny と設定ミスを区別する)
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::AuthError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("redirect to {location}")]
    Redirect {
        location: String,
        set_cookie: Option<HeaderValue>,
    },
    #[error("unauthorized")]
    Unauthorized,
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Redirect {
                location,
                set_cookie,
            } => return redirect_response(&location, set_cookie),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "authentication required".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

/// 307 to `location`, appending `set_cookie` when given.
pub fn redirect_response(location: &str, set_cookie: Option<HeaderValue>) -> Response {
    let Ok(location) = HeaderValue::from_str(location) else {
        tracing::error!(location = %location, "redirect location is not a valid header value");
        return AppError::Internal.into_response();
    };

    let mut res = StatusCode::TEMPORARY_REDIRECT.into_response();
    res.headers_mut().insert(header::LOCATION, location);
    if let Some(cookie) = set_cookie {
        res.headers_mut().append(header::SET_COOKIE, cookie);
    }
    res
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Redirect {
                location,
                set_cookie,
            } => AppError::Redirect {
                location,
                set_cookie,
            },
            AuthError::Denied => AppError::Unauthorized,
            // Wiring bug, not an auth outcome: fail loudly.
            AuthError::MiddlewareNotRegistered => {
                tracing::error!("auth accessor used on a route without the session stage");
                AppError::Internal
            }
        }
    }
}
