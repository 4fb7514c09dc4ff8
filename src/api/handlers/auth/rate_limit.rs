//! Rate limiting for the `/auth/*` routes.
//!
//! Fixed window per key: the first request opens a window of `window`
//! length, every request inside it counts, and requests past `max` are
//! rejected until the window closes. State lives in this process only.
//!
//! Two key spaces share the limiter: the client address (every `/auth/*`
//! request, via [`throttle`]) and the target email (passcode verification).
//! The client address is the TCP peer. `X-Forwarded-For` / `X-Real-IP` are
//! only read when [`AuthConfig::trust_proxy_headers`] is set.
//!
//! [`AuthConfig::trust_proxy_headers`]: super::state::AuthConfig::trust_proxy_headers

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
};
use tracing::warn;

use super::{state::AuthState, utils::extract_client_ip};
use crate::{api::error::ApiError, clock::Clock};

const THROTTLED_PREFIX: &str = "/auth/";

/// Counter state reported on allowed requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed(Option<Quota>),
    Limited { retry_after: u64 },
}

pub trait RateLimiter: Send + Sync {
    fn check_ip(&self, ip: &str) -> RateLimitDecision;
    fn check_email(&self, email: &str) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check_ip(&self, _ip: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed(None)
    }

    fn check_email(&self, _email: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed(None)
    }
}

#[derive(Clone, Copy, Debug)]
struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
}

pub struct WindowRateLimiter {
    max: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, Window>>,
}

impl WindowRateLimiter {
    #[must_use]
    pub fn new(max: u32, window_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max,
            window: Duration::try_seconds(window_seconds).unwrap_or(Duration::MAX),
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn hit(&self, key: String) -> RateLimitDecision {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        windows.retain(|_, window| window.reset_at > now);

        let window = windows.entry(key).or_insert(Window {
            count: 0,
            reset_at: now
                .checked_add_signed(self.window)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
        window.count = window.count.saturating_add(1);

        if window.count > self.max {
            let millis = (window.reset_at - now).num_milliseconds().max(0);
            let retry_after = u64::try_from((millis + 999) / 1000).unwrap_or(0);
            return RateLimitDecision::Limited { retry_after };
        }

        RateLimitDecision::Allowed(Some(Quota {
            limit: self.max,
            remaining: self.max - window.count,
            reset_at: window.reset_at.timestamp(),
        }))
    }
}

impl RateLimiter for WindowRateLimiter {
    fn check_ip(&self, ip: &str) -> RateLimitDecision {
        self.hit(format!("ip:{ip}"))
    }

    fn check_email(&self, email: &str) -> RateLimitDecision {
        self.hit(format!("email:{email}"))
    }
}

fn client_key(request: &Request, trust_proxy_headers: bool) -> String {
    let forwarded = if trust_proxy_headers {
        extract_client_ip(request.headers())
    } else {
        None
    };
    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware applied to the whole router; only `/auth/*` paths are counted.
pub async fn throttle(
    State(auth_state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    if !request.uri().path().starts_with(THROTTLED_PREFIX) {
        return next.run(request).await;
    }

    let key = client_key(&request, auth_state.config().trust_proxy_headers());
    match auth_state.rate_limiter().check_ip(&key) {
        RateLimitDecision::Limited { retry_after } => {
            warn!(client = %key, retry_after, "auth rate limit exceeded");
            ApiError::RateLimited { retry_after }.into_response()
        }
        RateLimitDecision::Allowed(quota) => {
            let mut response = next.run(request).await;
            if let Some(quota) = quota {
                let headers = response.headers_mut();
                for (name, value) in [
                    ("x-ratelimit-limit", i64::from(quota.limit)),
                    ("x-ratelimit-remaining", i64::from(quota.remaining)),
                    ("x-ratelimit-reset", quota.reset_at),
                ] {
                    if let Ok(value) = HeaderValue::from_str(&value.to_string()) {
                        headers.insert(name, value);
                    }
                }
            }
            response
        }
    }
}
