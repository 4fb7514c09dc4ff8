//! Session tokens: HS256 JWTs with `{sub, email, iat, exp}` claims.
//!
//! Expiry is checked against the injected clock rather than by `jsonwebtoken`
//! so that there is no leeway: a token is valid while `now < exp`.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AuthError;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Verified token subject.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSubject {
    pub user_id: Uuid,
    pub email: String,
}

pub struct SessionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_seconds: i64,
}

impl SessionTokens {
    #[must_use]
    pub fn new(secret: &SecretString, ttl_seconds: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
        }
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a token for `user_id` valid from `now` for the configured window.
    ///
    /// # Errors
    /// Returns an error if signing fails.
    pub fn mint(&self, user_id: Uuid, email: &str, now: DateTime<Utc>) -> Result<String> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .context("failed to sign session token")
    }

    /// Check signature, algorithm and expiry.
    ///
    /// # Errors
    /// `InvalidCredential` for anything that does not verify, `CredentialExpired`
    /// once `now >= exp`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<SessionSubject, AuthError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)
            .map_err(|_| AuthError::InvalidCredential)?;
        let claims = data.claims;

        if now.timestamp() >= claims.exp {
            return Err(AuthError::CredentialExpired);
        }

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidCredential)?;
        Ok(SessionSubject {
            user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const WINDOW: i64 = 7 * 24 * 60 * 60;

    fn minted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }

    fn tokens(secret: &str) -> SessionTokens {
        SessionTokens::new(&SecretString::from(secret.to_string()), WINDOW)
    }

    #[test]
    fn accepted_until_window_ends() -> Result<()> {
        let tokens = tokens("test-secret");
        let user_id = Uuid::new_v4();
        let token = tokens.mint(user_id, "a@example.com", minted_at())?;

        let just_before = minted_at() + Duration::seconds(WINDOW - 1);
        let subject = tokens.verify(&token, just_before);
        assert_eq!(
            subject.ok(),
            Some(SessionSubject {
                user_id,
                email: "a@example.com".to_string()
            })
        );

        let just_after = minted_at() + Duration::seconds(WINDOW + 1);
        assert!(matches!(
            tokens.verify(&token, just_after),
            Err(AuthError::CredentialExpired)
        ));
        Ok(())
    }

    #[test]
    fn rejects_foreign_signature() -> Result<()> {
        let token = tokens("one-secret").mint(Uuid::new_v4(), "a@example.com", minted_at())?;
        assert!(matches!(
            tokens("other-secret").verify(&token, minted_at()),
            Err(AuthError::InvalidCredential)
        ));
        Ok(())
    }

    #[test]
    fn rejects_garbage_and_other_algorithms() -> Result<()> {
        let tokens = tokens("test-secret");
        assert!(matches!(
            tokens.verify("not-a-jwt", minted_at()),
            Err(AuthError::InvalidCredential)
        ));

        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            email: "a@example.com".to_string(),
            iat: minted_at().timestamp(),
            exp: minted_at().timestamp() + WINDOW,
        };
        let hs512 = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )?;
        assert!(matches!(
            tokens.verify(&hs512, minted_at()),
            Err(AuthError::InvalidCredential)
        ));
        Ok(())
    }
}
