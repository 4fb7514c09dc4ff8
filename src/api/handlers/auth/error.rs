use crate::api::error::{ApiError, FieldError};

/// Failures of the passcode and session flows.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input")]
    Validation(Vec<FieldError>),
    /// No user for the presented email (issuance and verification).
    #[error("user not found")]
    NoSuchUser,
    #[error("passcode does not match a pending challenge")]
    InvalidChallenge,
    #[error("passcode expired")]
    Expired,
    #[error("missing bearer token")]
    Unauthenticated,
    #[error("session token rejected")]
    InvalidCredential,
    #[error("session token expired")]
    CredentialExpired,
    /// The token is valid but its subject has disappeared.
    #[error("session subject no longer exists")]
    PrincipalGone,
    /// Too many verification attempts for one email.
    #[error("too many attempts")]
    RateLimited { retry_after: u64 },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<FieldError> for AuthError {
    fn from(err: FieldError) -> Self {
        Self::Validation(vec![err])
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(errors) => Self::Validation(errors),
            AuthError::NoSuchUser => Self::NotFound("User not found"),
            AuthError::InvalidChallenge => Self::InvalidChallenge,
            AuthError::Expired => Self::Expired,
            AuthError::Unauthenticated => Self::Unauthenticated,
            AuthError::InvalidCredential => Self::InvalidCredential,
            AuthError::CredentialExpired => Self::CredentialExpired,
            AuthError::PrincipalGone => Self::UserNotFound,
            AuthError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            AuthError::Internal(err) => Self::Internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn maps_to_http_statuses() {
        let cases = [
            (AuthError::NoSuchUser, StatusCode::NOT_FOUND),
            (AuthError::InvalidChallenge, StatusCode::BAD_REQUEST),
            (AuthError::Expired, StatusCode::BAD_REQUEST),
            (AuthError::PrincipalGone, StatusCode::UNAUTHORIZED),
            (AuthError::CredentialExpired, StatusCode::UNAUTHORIZED),
            (
                AuthError::RateLimited { retry_after: 5 },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
