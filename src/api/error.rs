//! HTTP error mapping.
//!
//! Handlers return `Result<_, ApiError>`; the `IntoResponse` impl is the only
//! place that decides status codes and error bodies.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

/// One offending input field.
#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("invalid OTP")]
    InvalidChallenge,
    #[error("OTP expired")]
    Expired,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("authentication required")]
    Unauthenticated,
    #[error("invalid session token")]
    InvalidCredential,
    #[error("session token expired")]
    CredentialExpired,
    #[error("session user no longer exists")]
    UserNotFound,
    #[error("rate limited, retry in {retry_after}s")]
    RateLimited { retry_after: u64 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) | Self::InvalidChallenge | Self::Expired => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthenticated
            | Self::InvalidCredential
            | Self::CredentialExpired
            | Self::UserNotFound => StatusCode::UNAUTHORIZED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorBody {
        let message = match self {
            Self::BadRequest(message) | Self::NotFound(message) => (*message).to_string(),
            Self::Validation(_) => "Validation failed".to_string(),
            Self::InvalidChallenge => "Invalid OTP".to_string(),
            Self::Expired => "OTP expired".to_string(),
            Self::Unauthenticated => "Authentication required".to_string(),
            Self::InvalidCredential => "Invalid token".to_string(),
            Self::CredentialExpired => "Token expired".to_string(),
            Self::UserNotFound => "User not found".to_string(),
            Self::RateLimited { .. } => "Too many requests, please try again later".to_string(),
            Self::Internal(_) => "Server error".to_string(),
        };

        ErrorBody {
            message,
            errors: match self {
                Self::Validation(errors) => Some(errors.clone()),
                _ => None,
            },
            retry_after: match self {
                Self::RateLimited { retry_after } => Some(*retry_after),
                _ => None,
            },
            error: match self {
                Self::Internal(err) if cfg!(debug_assertions) => Some(format!("{err:#}")),
                _ => None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            error!("request failed: {err:#}");
        }

        let status = self.status();
        let mut response = (status, Json(self.body())).into_response();

        if let Self::RateLimited { retry_after } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}
