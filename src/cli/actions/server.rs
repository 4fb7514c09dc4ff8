use crate::api::{
    self,
    email::{EmailSender, LogEmailSender, SmtpConfig, SmtpEmailSender},
    handlers::auth::AuthConfig,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub jwt_secret: SecretString,
    pub otp_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub rate_limit_max: u32,
    pub rate_limit_window_seconds: i64,
    pub dev_expose_otp: bool,
    pub trust_proxy_headers: bool,
    pub smtp: Option<SmtpConfig>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the mail relay cannot be configured or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    if args.dev_expose_otp && !cfg!(debug_assertions) {
        warn!("--dev-expose-otp is ignored in release builds");
    }

    let email: Arc<dyn EmailSender> = match &args.smtp {
        Some(smtp) => Arc::new(
            SmtpEmailSender::new(smtp).context("Failed to configure SMTP email sender")?,
        ),
        None => Arc::new(LogEmailSender),
    };

    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_rate_limit(args.rate_limit_max, args.rate_limit_window_seconds)
        .with_expose_otp(args.dev_expose_otp)
        .with_trust_proxy_headers(args.trust_proxy_headers);

    api::new(args.port, args.dsn, auth_config, args.jwt_secret, email).await
}

fn log_startup_args(args: &Args) {
    let mailer = args.smtp.as_ref().map_or_else(
        || "log".to_string(),
        |smtp| format!("smtp://{}:{}", smtp.host(), smtp.port()),
    );
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("frontend_base_url", args.frontend_base_url.clone()),
        ("otp_ttl_seconds", args.otp_ttl_seconds.to_string()),
        ("session_ttl_seconds", args.session_ttl_seconds.to_string()),
        (
            "auth_rate_limit",
            format!(
                "{}/{}s",
                args.rate_limit_max, args.rate_limit_window_seconds
            ),
        ),
        ("trust_proxy_headers", args.trust_proxy_headers.to_string()),
        ("mailer", mailer),
        ("dev_expose_otp", args.dev_expose_otp.to_string()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const BANNER: &str = r"
  +---------+
  | ------- |
  | ------  |   H D   N O T E S {VERSION}
  | ------- |
  +---------+";
