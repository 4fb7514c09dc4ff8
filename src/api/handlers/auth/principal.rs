//! Authenticated principal extraction.
//!
//! Flow Overview: read the bearer token, verify it, and make sure its subject
//! still exists. Nothing is cached and nothing is written.

use axum::http::HeaderMap;
use uuid::Uuid;

use super::{error::AuthError, state::AuthState, utils::extract_bearer_token};
use crate::store::User;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Resolve the request's bearer token to the user it was issued for.
///
/// # Errors
/// `Unauthenticated`, `InvalidCredential`, `CredentialExpired`,
/// `PrincipalGone`, or `Internal` if the store fails.
pub async fn authenticate(headers: &HeaderMap, auth_state: &AuthState) -> Result<User, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::Unauthenticated)?;
    let subject = auth_state
        .tokens()
        .verify(&token, auth_state.clock().now())?;

    auth_state
        .users()
        .find_by_id(subject.user_id)
        .await?
        .ok_or(AuthError::PrincipalGone)
}

/// Like [`authenticate`], but only keeps the identity.
///
/// # Errors
/// Same as [`authenticate`].
pub async fn require_auth(headers: &HeaderMap, auth_state: &AuthState) -> Result<Principal, AuthError> {
    let user = authenticate(headers, auth_state).await?;
    Ok(Principal {
        user_id: user.id,
        email: user.email,
    })
}
