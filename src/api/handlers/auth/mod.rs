//! Auth handlers and supporting modules.
//!
//! Sign-in is passwordless: every signup or login stores a fresh six digit
//! passcode on the user record and emails it. Verifying the passcode consumes
//! it and returns an HS256 session token for `Authorization: Bearer`.
//!
//! ## Rate Limiting
//!
//! Every `/auth/*` route goes through [`rate_limit::throttle`]: 10 requests per
//! client address per 15 minutes by default. The address is the TCP peer
//! unless [`AuthConfig::with_trust_proxy_headers`] is set. Passcode
//! verification is also counted per email, so rotating addresses does not buy
//! more guesses. Over either limit the response is `429` with `retryAfter`
//! and a `Retry-After` header.

mod error;
pub mod login;
pub mod otp;
pub mod principal;
pub mod rate_limit;
pub mod session;
pub mod signup;
mod state;
pub mod token;
pub mod types;
mod utils;

pub use error::AuthError;
pub use principal::{authenticate, require_auth, Principal};
pub use rate_limit::{NoopRateLimiter, RateLimiter, WindowRateLimiter};
pub use state::{AuthConfig, AuthState};
