//! Small helpers for auth validation and passcode generation.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::NaiveDate;
use rand::{rngs::OsRng, Rng};
use regex::Regex;

use crate::api::error::FieldError;

pub(crate) const OTP_DIGITS: usize = 6;

/// Normalize an email for lookup/uniqueness checks.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic email format check on already-normalized input.
pub(crate) fn valid_email(email_normalized: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email_normalized))
}

/// Normalize and validate an email field, naming it in the error.
pub(super) fn checked_email(email: &str) -> Result<String, FieldError> {
    let email = normalize_email(email);
    if valid_email(&email) {
        Ok(email)
    } else {
        Err(FieldError::new("email", "Please provide a valid email"))
    }
}

/// Six decimal digits drawn uniformly from the OS CSPRNG, leading zeros kept.
pub(crate) fn generate_otp() -> String {
    let value: u32 = OsRng.gen_range(0..1_000_000);
    format!("{value:0width$}", width = OTP_DIGITS)
}

pub(super) fn validate_username(username: &str) -> Result<String, FieldError> {
    let username = username.trim();
    let length = username.chars().count();
    if (2..=50).contains(&length) {
        Ok(username.to_string())
    } else {
        Err(FieldError::new(
            "username",
            "Username must be between 2 and 50 characters",
        ))
    }
}

/// Dates are `YYYY-MM-DD` and must lie strictly before `today`.
pub(super) fn validate_date_of_birth(value: &str, today: NaiveDate) -> Result<NaiveDate, FieldError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| FieldError::new("dateOfBirth", "Please provide a valid date"))?;
    if date < today {
        Ok(date)
    } else {
        Err(FieldError::new(
            "dateOfBirth",
            "Date of birth must be in the past",
        ))
    }
}

/// Extract a client IP for rate limiting from common proxy headers.
pub(crate) fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn checked_email_names_field() {
        assert_eq!(checked_email(" New@Example.com"), Ok("new@example.com".to_string()));
        let err = checked_email("nope");
        assert_eq!(err.map_err(|e| e.field), Err("email".to_string()));
    }

    #[test]
    fn generate_otp_is_six_digits() {
        for _ in 0..200 {
            let code = generate_otp();
            assert_eq!(code.len(), OTP_DIGITS);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn username_bounds() {
        assert!(validate_username("a").is_err());
        assert!(validate_username("  ab  ").is_ok());
        assert!(validate_username(&"x".repeat(50)).is_ok());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn date_of_birth_must_be_past() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap_or_default();
        assert!(validate_date_of_birth("1990-01-31", today).is_ok());
        assert!(validate_date_of_birth("2024-05-01", today).is_err());
        assert!(validate_date_of_birth("2030-01-01", today).is_err());
        assert!(validate_date_of_birth("31/01/1990", today).is_err());
    }

    #[test]
    fn extract_client_ip_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("1.2.3.4, 5.6.7.8"),
        );
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("1.2.3.4".to_string()));
    }

    #[test]
    fn extract_client_ip_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        assert_eq!(extract_client_ip(&headers), Some("9.9.9.9".to_string()));
    }

    #[test]
    fn extract_client_ip_none_when_missing() {
        assert_eq!(extract_client_ip(&HeaderMap::new()), None);
    }

    #[test]
    fn extract_bearer_token_requires_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def".to_string()));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer_token(&headers), None);
    }
}
