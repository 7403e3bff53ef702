//! Signed session tokens (HS256 JWT).
//!
//! Tokens are stateless: validity is decided only by signature and expiry.
//! There is no refresh, rotation or revocation; logout is the client dropping
//! its token, and a token stays valid for its full lifetime.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use orgdesk_core::UserId;

use crate::{validate_claims, AuthConfig, Claims, TokenValidationError};

/// Wire representation of the claims.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
    jti: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed: {0}")]
    Encoding(String),
}

/// Issues and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.jwt_secret.as_bytes(), config.token_ttl)
    }

    /// Issue a token valid from now for the configured lifetime.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String, TokenError> {
        self.issue_at(user_id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: UserId,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| TokenError::Encoding("expiry out of range".into()))?;
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7().to_string(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify signature and structure, then check the time window against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        // Expiry is checked by `validate_claims` so that `now` is honoured.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Claims(TokenValidationError::Expired),
                _ => TokenError::Malformed(e.to_string()),
            })?;

        let raw = data.claims;
        let user_id = raw
            .sub
            .parse::<UserId>()
            .map_err(|e| TokenError::Malformed(e.to_string()))?;
        let issued_at = DateTime::<Utc>::from_timestamp(raw.iat, 0)
            .ok_or_else(|| TokenError::Malformed("iat out of range".into()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(raw.exp, 0)
            .ok_or_else(|| TokenError::Malformed("exp out of range".into()))?;

        let claims = Claims {
            user_id,
            email: raw.email,
            issued_at,
            expires_at,
        };
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

impl core::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(b"test-secret", Duration::hours(24))
    }

    #[test]
    fn fresh_token_carries_identity_and_window() {
        let svc = service();
        let now = Utc::now();
        let token = svc.issue(UserId::new(7), "alice@example.com").unwrap();
        let claims = svc.verify(&token).unwrap();

        assert_eq!(claims.user_id, UserId::new(7));
        assert_eq!(claims.email, "alice@example.com");
        assert!((claims.issued_at - now).num_seconds().abs() <= 60);
        let expected_exp = now + Duration::hours(24);
        assert!((claims.expires_at - expected_exp).num_minutes().abs() <= 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let issued = Utc::now() - Duration::hours(25);
        let token = svc.issue_at(UserId::new(1), "a@example.com", issued).unwrap();

        assert_eq!(
            svc.verify(&token),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn token_is_valid_until_expiry() {
        let svc = service();
        let issued = Utc::now();
        let token = svc.issue_at(UserId::new(1), "a@example.com", issued).unwrap();

        assert!(svc.verify_at(&token, issued + Duration::hours(23)).is_ok());
        assert!(svc.verify_at(&token, issued + Duration::hours(24)).is_err());
    }

    #[test]
    fn unrepresentable_expiry_is_an_error() {
        let svc = TokenService::new(b"test-secret", Duration::hours(1_000_000_000_000));

        assert_eq!(
            svc.issue(UserId::new(1), "a@example.com"),
            Err(TokenError::Encoding("expiry out of range".into()))
        );
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = TokenService::new(b"other-secret", Duration::hours(24))
            .issue(UserId::new(1), "a@example.com")
            .unwrap();

        assert_eq!(service().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        for token in ["", "abc", "a.b.c"] {
            assert!(
                matches!(service().verify(token), Err(TokenError::Malformed(_))),
                "accepted {token:?}"
            );
        }
    }

    #[test]
    fn tampered_payload_fails_signature() {
        let svc = service();
        let token = svc.issue(UserId::new(1), "a@example.com").unwrap();
        let other = svc.issue(UserId::new(2), "b@example.com").unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert_eq!(svc.verify(&forged), Err(TokenError::InvalidSignature));
    }
}
