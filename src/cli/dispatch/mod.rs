use crate::api::email::SmtpConfig;
use crate::cli::{
    actions::{server::Args, Action},
    commands::{auth, email},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(auth::ARG_JWT_SECRET)
        .cloned()
        .filter(|secret| !secret.trim().is_empty())
        .map(SecretString::from)
        .context("missing required argument: --jwt-secret")?;

    let frontend_base_url = matches
        .get_one::<String>(auth::ARG_FRONTEND_BASE_URL)
        .cloned()
        .context("missing required argument: --frontend-base-url")?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url,
        jwt_secret,
        otp_ttl_seconds: matches
            .get_one::<i64>(auth::ARG_OTP_TTL_SECONDS)
            .copied()
            .unwrap_or(300),
        session_ttl_seconds: matches
            .get_one::<i64>(auth::ARG_SESSION_TTL_SECONDS)
            .copied()
            .unwrap_or(604_800),
        rate_limit_max: matches
            .get_one::<u32>(auth::ARG_RATE_LIMIT_MAX)
            .copied()
            .unwrap_or(10),
        rate_limit_window_seconds: matches
            .get_one::<i64>(auth::ARG_RATE_LIMIT_WINDOW_SECONDS)
            .copied()
            .unwrap_or(900),
        dev_expose_otp: matches.get_flag(auth::ARG_DEV_EXPOSE_OTP),
        trust_proxy_headers: matches.get_flag(auth::ARG_TRUST_PROXY_HEADERS),
        smtp: smtp_config(matches)?,
    }))
}

fn smtp_config(matches: &clap::ArgMatches) -> Result<Option<SmtpConfig>> {
    let Some(host) = matches.get_one::<String>(email::ARG_SMTP_HOST).cloned() else {
        return Ok(None);
    };
    let from = matches
        .get_one::<String>(email::ARG_EMAIL_FROM)
        .cloned()
        .context("missing required argument: --email-from")?;

    let mut config = SmtpConfig::new(host, from);
    if let Some(port) = matches.get_one::<u16>(email::ARG_SMTP_PORT).copied() {
        config = config.with_port(port);
    }
    if let (Some(username), Some(password)) = (
        matches.get_one::<String>(email::ARG_SMTP_USERNAME),
        matches.get_one::<String>(email::ARG_SMTP_PASSWORD),
    ) {
        config = config.with_credentials(username.clone(), SecretString::from(password.clone()));
    }

    Ok(Some(config))
}
