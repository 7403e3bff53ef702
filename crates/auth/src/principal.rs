use orgdesk_core::UserId;

use crate::Claims;

/// Identity of an authenticated caller.
///
/// Produced from verified token claims and passed explicitly into every
/// organization-scoped operation; nothing is read from ambient request state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    user_id: UserId,
    email: String,
}

impl AuthenticatedIdentity {
    pub fn new(user_id: UserId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

impl From<Claims> for AuthenticatedIdentity {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
        }
    }
}
