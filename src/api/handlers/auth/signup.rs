//! Signup: request a passcode for a (possibly new) email, then verify it.

use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{instrument, warn};

use super::{
    otp::{self, IssueOutcome, Verified},
    state::AuthState,
    types::{ChallengeResponse, SessionResponse, SignupRequest, UserSummary, VerifyOtpRequest},
};
use crate::api::error::{ApiError, ErrorBody};

pub(super) fn challenge_response(
    auth_state: &AuthState,
    outcome: IssueOutcome,
    message: &str,
) -> ChallengeResponse {
    if !outcome.delivered {
        warn!(user_id = %outcome.user.id, "passcode email was not delivered");
    }
    ChallengeResponse {
        message: message.to_string(),
        email: outcome.user.email,
        otp: auth_state.config().expose_otp().then_some(outcome.code),
    }
}

pub(super) fn session_response(verified: Verified, message: &str) -> SessionResponse {
    SessionResponse {
        message: message.to_string(),
        token: verified.token,
        user: UserSummary::from(&verified.user),
    }
}

#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 200, description = "Passcode issued and emailed", body = ChallengeResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody),
        (status = 500, description = "Server error", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn signup(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let outcome = otp::issue_signup(&auth_state, &request).await?;
    Ok(Json(challenge_response(
        &auth_state,
        outcome,
        "OTP generated successfully",
    )))
}

#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Passcode accepted, session token issued", body = SessionResponse),
        (status = 400, description = "Invalid input, invalid or expired passcode", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody),
        (status = 500, description = "Server error", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let verified = otp::verify(&auth_state, &request.email, &request.otp).await?;
    Ok(Json(session_response(verified, "OTP verified successfully")))
}
