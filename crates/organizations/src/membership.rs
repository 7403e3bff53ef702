use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgdesk_auth::Role;
use orgdesk_core::{Entity, MembershipId, OrganizationId, UserId};

/// A user's membership in an organization.
///
/// At most one exists per `(user_id, organization_id)` pair. Memberships are
/// the only source of truth for who may act within an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Entity for Membership {
    type Id = MembershipId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A membership joined with the member's email, for member listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    pub id: MembershipId,
    pub user_id: UserId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
