//! Password hashing, password policy and email syntax checks.
//!
//! Hashes are Argon2id PHC strings: algorithm, parameters and a random salt are
//! embedded in the hash itself, so verification needs nothing but the string.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

/// Minimum password length, counted in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Weak values rejected regardless of character classes (case-insensitive).
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "passw0rd",
    "12345678",
    "123456789",
    "11111111",
    "abc12345",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "letmein1",
];

/// Argon2id cost parameters.
#[derive(Clone, Debug)]
pub struct PasswordConfig {
    /// Memory cost in KiB.
    pub memory_cost: u32,
    /// Iterations.
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests and local development. Never use in production.
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Password policy violation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("password must contain an uppercase letter")]
    MissingUppercase,

    #[error("password must contain a lowercase letter")]
    MissingLowercase,

    #[error("password must contain a digit")]
    MissingDigit,

    #[error("password is too common")]
    TooCommon,
}

/// Hashes and verifies passwords with Argon2id.
#[derive(Clone, Debug, Default)]
pub struct PasswordHasher {
    config: PasswordConfig,
}

impl PasswordHasher {
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| CredentialError::Hashing(format!("invalid argon2 params: {e}")))?;

        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }

    /// `true` iff `password` matches `hash`.
    ///
    /// A mismatch is a plain `false`. A stored hash that cannot be parsed is
    /// logged and also treated as a mismatch.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash is malformed");
                return false;
            }
        };

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Check a candidate password against the registration policy.
pub fn validate_password_policy(password: &str) -> Result<(), PolicyError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PolicyError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.iter().any(|common| *common == lowered) {
        return Err(PolicyError::TooCommon);
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(PolicyError::MissingUppercase);
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(PolicyError::MissingLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PolicyError::MissingDigit);
    }

    Ok(())
}

/// Conservative `local@domain.tld` filter.
///
/// Accepts exactly one `@`, a non-empty local part, no whitespace anywhere and a
/// domain containing a dot with at least one character on each side of it.
/// This is not RFC 5322 validation: `user@com` is rejected, quoted local parts
/// are not understood.
pub fn validate_email_syntax(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }

    let domain: Vec<char> = domain.chars().collect();
    if domain.len() < 3 {
        return false;
    }
    domain[1..domain.len() - 1].contains(&'.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::new(PasswordConfig::fast())
    }

    #[test]
    fn policy_rejects_weak_passwords() {
        for weak in [
            "password",
            "12345678",
            "short",
            "nouppercase123",
            "NOLOWERCASE123",
            "NoDigitsHere",
            "",
        ] {
            assert!(validate_password_policy(weak).is_err(), "accepted {weak:?}");
        }
    }

    #[test]
    fn policy_accepts_strong_password() {
        assert_eq!(validate_password_policy("Password123"), Ok(()));
        assert_eq!(validate_password_policy("Secure456"), Ok(()));
    }

    #[test]
    fn policy_reports_specific_violation() {
        assert_eq!(
            validate_password_policy("short"),
            Err(PolicyError::TooShort { min: 8 })
        );
        assert_eq!(
            validate_password_policy("nouppercase123"),
            Err(PolicyError::MissingUppercase)
        );
        assert_eq!(
            validate_password_policy("NOLOWERCASE123"),
            Err(PolicyError::MissingLowercase)
        );
        assert_eq!(
            validate_password_policy("NoDigitsHere"),
            Err(PolicyError::MissingDigit)
        );
    }

    #[test]
    fn common_passwords_match_case_insensitively() {
        assert_eq!(validate_password_policy("QWERTY123"), Err(PolicyError::TooCommon));
        assert_eq!(validate_password_policy("Passw0rd"), Err(PolicyError::TooCommon));
    }

    #[test]
    fn email_syntax_accepts_ordinary_addresses() {
        for email in [
            "alice@example.com",
            "user.name+tag@sub.example.org",
            "a@b.co",
        ] {
            assert!(validate_email_syntax(email), "rejected {email:?}");
        }
    }

    #[test]
    fn email_syntax_rejects_malformed_addresses() {
        for email in [
            "",
            "user",
            "user@com",
            "@example.com",
            "user@",
            "user@@example.com",
            "user@example.",
            "us er@example.com",
            "user@exa mple.com",
            "user@example.com ",
            "a@b@example.com",
        ] {
            assert!(!validate_email_syntax(email), "accepted {email:?}");
        }
    }

    #[test]
    fn hash_is_salted() {
        let h = hasher();
        let a = h.hash("Password123").unwrap();
        let b = h.hash("Password123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(h.verify("Password123", &a));
        assert!(h.verify("Password123", &b));
    }

    #[test]
    fn verify_treats_garbage_hash_as_mismatch() {
        assert!(!hasher().verify("Password123", "not-a-phc-string"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn hash_then_verify_round_trips(password in "[A-Z][a-z]{4,12}[0-9]{2,4}") {
            let h = hasher();
            let hash = h.hash(&password).unwrap();
            prop_assert!(h.verify(&password, &hash));
        }

        #[test]
        fn verify_rejects_other_passwords(
            a in "[A-Z][a-z]{6}[0-9]{2}",
            b in "[A-Z][a-z]{6}[0-9]{2}",
        ) {
            prop_assume!(a != b);
            let h = hasher();
            let hash = h.hash(&b).unwrap();
            prop_assert!(!h.verify(&a, &hash));
        }

        #[test]
        fn emails_with_whitespace_are_rejected(
            local in "[a-z]{1,8}",
            ws in "[ \t\n]",
            domain in "[a-z]{1,8}",
        ) {
            let email = format!("{local}{ws}@{domain}.com");
            prop_assert!(!validate_email_syntax(&email));
        }

        #[test]
        fn simple_dotted_addresses_are_accepted(
            local in "[a-z0-9._+-]{1,12}",
            domain in "[a-z0-9-]{1,12}",
            tld in "[a-z]{2,6}",
        ) {
            let email = format!("{local}@{domain}.{tld}");
            prop_assert!(validate_email_syntax(&email));
        }
    }
}
