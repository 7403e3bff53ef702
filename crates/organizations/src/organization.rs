use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use orgdesk_auth::Role;
use orgdesk_core::{Entity, OrganizationId, OrganizationName};

/// An organization (tenant).
///
/// # Invariants
/// - `name` is unique across all organizations (exact string match).
/// - At least one membership with role `admin` exists for it at all times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Opaque billing blob owned by the caller; `None` until set.
    pub billing_details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Organization {
    type Id = OrganizationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Data needed to insert a new organization.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrganization {
    pub name: OrganizationName,
    pub billing_details: Option<JsonValue>,
}

impl NewOrganization {
    pub fn new(name: OrganizationName) -> Self {
        Self {
            name,
            billing_details: None,
        }
    }
}

/// An organization as seen by one member, annotated with that member's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationView {
    pub id: OrganizationId,
    pub name: String,
    pub billing_details: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

impl OrganizationView {
    pub fn new(organization: Organization, role: Role) -> Self {
        Self {
            id: organization.id,
            name: organization.name,
            billing_details: organization.billing_details,
            created_at: organization.created_at,
            role,
        }
    }
}
