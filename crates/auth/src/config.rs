//! Authentication configuration.

use chrono::Duration;

use crate::PasswordConfig;

/// Signing secret used when none is configured. Only fit for local development.
pub const DEV_JWT_SECRET: &str = "dev-secret";

/// Configuration for credential hashing and token issuance.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret shared by issuer and verifier.
    pub jwt_secret: String,
    /// Lifetime of an issued session token (default: 24 hours).
    pub token_ttl: Duration,
    pub password: PasswordConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl: Duration::hours(24),
            password: PasswordConfig::default(),
        }
    }
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Default::default()
        }
    }

    /// `true` when tokens would be signed with the development default.
    pub fn uses_insecure_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET || self.jwt_secret.is_empty()
    }
}

impl core::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("password", &self.password)
            .finish()
    }
}
