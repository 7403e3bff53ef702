use thiserror::Error;

use orgdesk_auth::{AuthzError, CredentialError, PolicyError, TokenError};

use crate::store::StoreError;

/// Every failure the identity and organization services report.
///
/// Kinds stay distinct so the HTTP layer can choose between 400, 401, 403,
/// 404 and 409. `Internal` carries no detail; the cause is logged where the
/// error is created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("weak password: {0}")]
    WeakPassword(#[from] PolicyError),

    #[error("email already registered")]
    EmailExists,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("organization name must not be blank")]
    InvalidName,

    #[error("organization name already taken")]
    NameExists,

    #[error("access denied")]
    AccessDenied,

    #[error("admin role required")]
    AdminRequired,

    #[error("role must be 'admin' or 'member'")]
    InvalidRole,

    #[error("not found")]
    NotFound,

    #[error("organization must keep at least one admin")]
    LastAdmin,

    #[error("user is already a member of this organization")]
    AlreadyMember,

    #[error("internal error")]
    Internal,
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::AccessDenied => ServiceError::AccessDenied,
            AuthzError::AdminRequired => ServiceError::AdminRequired,
            AuthzError::LastAdmin => ServiceError::LastAdmin,
        }
    }
}

/// Unclassified storage failures. Constraint violations the caller can act on
/// are mapped explicitly at each call site before reaching this.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "storage failure");
        ServiceError::Internal
    }
}

impl From<CredentialError> for ServiceError {
    fn from(err: CredentialError) -> Self {
        tracing::error!(error = %err, "credential failure");
        ServiceError::Internal
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        tracing::error!(error = %err, "token issuance failure");
        ServiceError::Internal
    }
}
