//! # hdnotes (Notes API with email one-time passcodes)
//!
//! `hdnotes` serves a small notes application. Users sign up and sign in with
//! a six digit one-time passcode (OTP) delivered by email, receive a signed
//! bearer token, and manage their own notes.
//!
//! ## Authentication
//!
//! - **Challenge issuance:** `POST /auth/signup` creates the user on first
//!   contact, `POST /auth/login` requires an existing user. Both store a fresh
//!   challenge (code + expiry) on the user record, overwriting any previous one,
//!   and email the code. Delivery failures are logged, never returned.
//! - **Verification:** the presented code must match the stored value exactly
//!   and the expiry must be in the future. Consumption is a single conditional
//!   update so a code verifies at most once, even under concurrent requests.
//! - **Sessions:** a successful verification mints an HS256 JWT carrying the
//!   user id and email. Tokens are stateless; every authenticated request
//!   checks the signature, the expiry, and that the user still exists.
//!
//! ## Notes
//!
//! Notes are owned by exactly one user. Every lookup is keyed by
//! `(note_id, owner_id)`, so another user's note id returns `404 Not Found`
//! rather than `403 Forbidden`.
//!
//! ## Throttling
//!
//! The `/auth/*` routes are throttled per client address, and passcode
//! verification per email, with an in-process fixed window counter. The counter is local to one process; run a single
//! instance or swap the `RateLimiter` implementation for a shared one.

pub mod api;
pub mod cli;
pub mod clock;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
