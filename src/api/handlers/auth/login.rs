//! Login for existing users: same passcode mechanism as signup, no user creation.

use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::instrument;

use super::{
    otp,
    signup::{challenge_response, session_response},
    state::AuthState,
    types::{ChallengeResponse, LoginRequest, SessionResponse, VerifyOtpRequest},
};
use crate::api::error::{ApiError, ErrorBody};

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Passcode issued and emailed", body = ChallengeResponse),
        (status = 400, description = "Invalid email", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody),
        (status = 500, description = "Server error", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Json<ChallengeResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let outcome = otp::issue_login(&auth_state, &request.email).await?;
    Ok(Json(challenge_response(
        &auth_state,
        outcome,
        "OTP sent to your email",
    )))
}

#[utoipa::path(
    post,
    path = "/auth/verify-login-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Passcode accepted, session token issued", body = SessionResponse),
        (status = 400, description = "Invalid input, invalid or expired passcode", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
        (status = 429, description = "Too many requests", body = ErrorBody)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn verify_login_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let Some(Json(request)) = payload else {
        return Err(ApiError::BadRequest("Missing payload"));
    };

    let verified = otp::verify(&auth_state, &request.email, &request.otp).await?;
    Ok(Json(session_response(verified, "Login successful")))
}
