//! Auth state and configuration.

use secrecy::SecretString;
use std::sync::Arc;

use super::{rate_limit::RateLimiter, token::SessionTokens};
use crate::{api::email::EmailSender, clock::Clock, store::UserStore};

const DEFAULT_OTP_TTL_SECONDS: i64 = 5 * 60;
const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_RATE_LIMIT_MAX: u32 = 10;
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: i64 = 15 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    otp_ttl_seconds: i64,
    session_ttl_seconds: i64,
    rate_limit_max: u32,
    rate_limit_window_seconds: i64,
    expose_otp: bool,
    trust_proxy_headers: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            otp_ttl_seconds: DEFAULT_OTP_TTL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
            rate_limit_window_seconds: DEFAULT_RATE_LIMIT_WINDOW_SECONDS,
            expose_otp: false,
            trust_proxy_headers: false,
        }
    }

    #[must_use]
    pub fn with_otp_ttl_seconds(mut self, seconds: i64) -> Self {
        self.otp_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, max: u32, window_seconds: i64) -> Self {
        self.rate_limit_max = max;
        self.rate_limit_window_seconds = window_seconds;
        self
    }

    /// Echo issued passcodes in responses. Ignored in release builds.
    #[must_use]
    pub fn with_expose_otp(mut self, expose: bool) -> Self {
        self.expose_otp = expose;
        self
    }

    /// Key the auth throttle on `X-Forwarded-For` / `X-Real-IP` instead of
    /// the TCP peer. Only safe behind a proxy that overwrites those headers.
    #[must_use]
    pub fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn otp_ttl_seconds(&self) -> i64 {
        self.otp_ttl_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn rate_limit_max(&self) -> u32 {
        self.rate_limit_max
    }

    #[must_use]
    pub fn rate_limit_window_seconds(&self) -> i64 {
        self.rate_limit_window_seconds
    }

    #[must_use]
    pub fn expose_otp(&self) -> bool {
        cfg!(debug_assertions) && self.expose_otp
    }

    #[must_use]
    pub fn trust_proxy_headers(&self) -> bool {
        self.trust_proxy_headers
    }
}

/// Everything the auth handlers share, passed around as `Extension<Arc<AuthState>>`.
pub struct AuthState {
    config: AuthConfig,
    users: Arc<dyn UserStore>,
    tokens: SessionTokens,
    email: Arc<dyn EmailSender>,
    rate_limiter: Arc<dyn RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        jwt_secret: &SecretString,
        users: Arc<dyn UserStore>,
        email: Arc<dyn EmailSender>,
        rate_limiter: Arc<dyn RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tokens = SessionTokens::new(jwt_secret, config.session_ttl_seconds());
        Self {
            config,
            users,
            tokens,
            email,
            rate_limiter,
            clock,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.users.as_ref()
    }

    #[must_use]
    pub fn tokens(&self) -> &SessionTokens {
        &self.tokens
    }

    #[must_use]
    pub fn email(&self) -> Arc<dyn EmailSender> {
        self.email.clone()
    }

    #[must_use]
    pub fn rate_limiter(&self) -> Arc<dyn RateLimiter> {
        self.rate_limiter.clone()
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
