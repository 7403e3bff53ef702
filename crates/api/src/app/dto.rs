use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use orgdesk_auth::User;
use orgdesk_organizations::{MemberView, Membership, OrganizationView};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// `billing_details: null` (or omitting it) clears the stored blob.
#[derive(Debug, Deserialize)]
pub struct BillingDetailsRequest {
    #[serde(default)]
    pub billing_details: Option<JsonValue>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CurrentUserResponse {
    pub user: User,
    pub organizations: Vec<OrganizationView>,
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub organization: OrganizationView,
}

#[derive(Debug, Serialize)]
pub struct OrganizationsResponse {
    pub organizations: Vec<OrganizationView>,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberView>,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub membership: Membership,
}
