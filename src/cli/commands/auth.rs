use clap::{Arg, ArgAction, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_OTP_TTL_SECONDS: &str = "otp-ttl-seconds";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RATE_LIMIT_MAX: &str = "auth-rate-limit-max";
pub const ARG_RATE_LIMIT_WINDOW_SECONDS: &str = "auth-rate-limit-window-seconds";
pub const ARG_DEV_EXPOSE_OTP: &str = "dev-expose-otp";
pub const ARG_TRUST_PROXY_HEADERS: &str = "trust-proxy-headers";

/// One year; keeps expiry arithmetic far from chrono's limits.
const MAX_SECONDS: i64 = 31_536_000;

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_session_args(command);
    with_throttle_args(command)
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL, the only origin allowed by CORS")
                .env("HDNOTES_FRONTEND_BASE_URL")
                .default_value("http://localhost:5173"),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign session tokens (HS256)")
                .env("HDNOTES_JWT_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_OTP_TTL_SECONDS)
                .long(ARG_OTP_TTL_SECONDS)
                .help("One-time passcode TTL in seconds")
                .env("HDNOTES_OTP_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SECONDS)),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("HDNOTES_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SECONDS)),
        )
        .arg(
            Arg::new(ARG_DEV_EXPOSE_OTP)
                .long(ARG_DEV_EXPOSE_OTP)
                .help("Echo the passcode in challenge responses (debug builds only)")
                .env("HDNOTES_DEV_EXPOSE_OTP")
                .action(ArgAction::SetTrue),
        )
}

fn with_throttle_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_RATE_LIMIT_MAX)
                .long(ARG_RATE_LIMIT_MAX)
                .help("Requests allowed per client on /auth/* within one window")
                .env("HDNOTES_AUTH_RATE_LIMIT_MAX")
                .default_value("10")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .long(ARG_RATE_LIMIT_WINDOW_SECONDS)
                .help("Length of the /auth/* rate limit window in seconds")
                .env("HDNOTES_AUTH_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_SECONDS)),
        )
        .arg(
            Arg::new(ARG_TRUST_PROXY_HEADERS)
                .long(ARG_TRUST_PROXY_HEADERS)
                .help("Key the /auth/* limit on X-Forwarded-For / X-Real-IP (only behind a trusted proxy)")
                .env("HDNOTES_TRUST_PROXY_HEADERS")
                .action(ArgAction::SetTrue),
        )
}
