//! Passcode challenge issuance and verification.
//!
//! Flow Overview:
//! 1) Issue: validate input, draw a fresh code, store it on the user record
//!    with one write (insert for a new signup, overwrite otherwise), email it.
//! 2) Verify: count the attempt against the email's window, look up the user, compare the presented code to the stored one,
//!    check the expiry, then consume the challenge with a conditional update.
//!    Only the request whose update matches gets a session token.
//!
//! A newer challenge always replaces the previous one, so only the latest
//! code can verify.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use super::{
    error::AuthError,
    rate_limit::RateLimitDecision,
    state::AuthState,
    types::SignupRequest,
    utils::{checked_email, generate_otp, validate_date_of_birth, validate_username},
};
use crate::{
    api::email::{deliver, otp_message, spawn_delivery, welcome_message},
    api::error::FieldError,
    store::{Challenge, NewUser, User},
};

#[derive(Debug)]
pub struct IssueOutcome {
    pub user: User,
    pub code: String,
    pub delivered: bool,
    pub created: bool,
}

#[derive(Debug)]
pub struct Verified {
    pub user: User,
    pub token: String,
    pub first_verification: bool,
}

fn new_challenge(state: &AuthState) -> Challenge {
    let ttl = Duration::try_seconds(state.config().otp_ttl_seconds()).unwrap_or(Duration::MAX);
    Challenge {
        code: generate_otp(),
        expires_at: state
            .clock()
            .now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    }
}

fn ttl_minutes(state: &AuthState) -> i64 {
    state.config().otp_ttl_seconds().saturating_add(59) / 60
}

async fn send_code(state: &AuthState, user: &User, code: &str) -> bool {
    let message = otp_message(&user.email, &user.username, code, ttl_minutes(state));
    deliver(state.email().as_ref(), &message).await
}

/// Issue a challenge for a signup, creating the user when the email is new.
///
/// An existing user keeps their profile; only the challenge is replaced.
///
/// # Errors
/// `Validation` naming every bad field, `Internal` on store failures.
#[instrument(skip(state, request))]
pub async fn issue_signup(
    state: &AuthState,
    request: &SignupRequest,
) -> Result<IssueOutcome, AuthError> {
    let today = state.clock().now().date_naive();
    let mut errors: Vec<FieldError> = Vec::new();

    let email = checked_email(&request.email).map_err(|err| errors.push(err)).ok();
    let username = validate_username(&request.username)
        .map_err(|err| errors.push(err))
        .ok();
    let date_of_birth = validate_date_of_birth(&request.date_of_birth, today)
        .map_err(|err| errors.push(err))
        .ok();

    let (Some(email), Some(username), Some(date_of_birth)) = (email, username, date_of_birth)
    else {
        return Err(AuthError::Validation(errors));
    };

    let challenge = new_challenge(state);
    let record = state
        .users()
        .upsert_signup_challenge(
            &NewUser {
                email,
                username,
                date_of_birth,
            },
            &challenge,
        )
        .await?;

    info!(user_id = %record.user.id, created = record.created, "signup challenge issued");

    let delivered = send_code(state, &record.user, &challenge.code).await;
    Ok(IssueOutcome {
        user: record.user,
        code: challenge.code,
        delivered,
        created: record.created,
    })
}

/// Issue a challenge for an existing user.
///
/// # Errors
/// `Validation` for a malformed email, `NoSuchUser` when nobody owns it.
#[instrument(skip(state, email))]
pub async fn issue_login(state: &AuthState, email: &str) -> Result<IssueOutcome, AuthError> {
    let email = checked_email(email)?;
    let challenge = new_challenge(state);

    let user = state
        .users()
        .set_challenge_by_email(&email, &challenge)
        .await?
        .ok_or(AuthError::NoSuchUser)?;

    info!(user_id = %user.id, "login challenge issued");

    let delivered = send_code(state, &user, &challenge.code).await;
    Ok(IssueOutcome {
        user,
        code: challenge.code,
        delivered,
        created: false,
    })
}

/// Verify a presented passcode and mint a session token.
///
/// # Errors
/// See the module docs for the check order. `Expired` leaves the stale
/// challenge in place; it can never verify and the next issuance replaces it.
#[instrument(skip(state, email, presented))]
pub async fn verify(state: &AuthState, email: &str, presented: &str) -> Result<Verified, AuthError> {
    let mut errors = Vec::new();
    let email = checked_email(email).map_err(|err| errors.push(err)).ok();
    if presented.trim().is_empty() {
        errors.push(FieldError::new("otp", "OTP is required"));
    }
    let Some(email) = email.filter(|_| errors.is_empty()) else {
        return Err(AuthError::Validation(errors));
    };

    if let RateLimitDecision::Limited { retry_after } = state.rate_limiter().check_email(&email) {
        warn!(retry_after, "verification rate limit exceeded");
        return Err(AuthError::RateLimited { retry_after });
    }

    let user = state
        .users()
        .find_by_email(&email)
        .await?
        .ok_or(AuthError::NoSuchUser)?;

    let Some(challenge) = user.challenge.as_ref().filter(|c| c.code == presented) else {
        return Err(AuthError::InvalidChallenge);
    };

    let now = state.clock().now();
    if challenge.expires_at <= now {
        return Err(AuthError::Expired);
    }

    let consumed = state
        .users()
        .consume_challenge(user.id, presented, now)
        .await?
        .ok_or(AuthError::InvalidChallenge)?;

    let token = state
        .tokens()
        .mint(consumed.user.id, &consumed.user.email, now)?;

    let first_verification = !consumed.was_verified;
    if first_verification {
        spawn_delivery(
            state.email(),
            welcome_message(&consumed.user.email, &consumed.user.username),
        );
    }

    info!(user_id = %consumed.user.id, first_verification, "challenge verified");

    Ok(Verified {
        user: consumed.user,
        token,
        first_verification,
    })
}
