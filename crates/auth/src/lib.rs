//! `orgdesk-auth`: credentials, session tokens and authorization policy.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod config;
pub mod credential;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{authorize, ensure_admin_remains, AccessLevel, AuthzError};
pub use claims::{validate_claims, Claims, TokenValidationError};
pub use config::AuthConfig;
pub use credential::{
    validate_email_syntax, validate_password_policy, CredentialError, PasswordConfig,
    PasswordHasher, PolicyError,
};
pub use principal::AuthenticatedIdentity;
pub use roles::{Role, UnknownRole};
pub use token::{TokenError, TokenService};
pub use user::{User, UserCredentials};
