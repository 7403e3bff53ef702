use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

use orgdesk_auth::{Role, User, UserCredentials};
use orgdesk_core::{MembershipId, OrganizationId, UserId};
use orgdesk_organizations::{MemberView, Membership, NewOrganization, Organization, OrganizationView};

/// Storage operation error.
///
/// Constraint violations are reported distinctly so that callers can treat the
/// store, not an application-level pre-check, as the authority on uniqueness.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("foreign key violated: {0}")]
    ForeignKey(String),

    /// The row targeted by an update/delete does not exist.
    #[error("record not found")]
    NotFound,

    /// Anything else (connection loss, corrupt row, poisoned lock...).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Outcome of [`OrganizationStore::change_membership`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    /// Written. Carries the updated row, or the removed one.
    Applied(Membership),
    /// Refused: the target is the organization's last admin.
    LastAdmin,
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; fails with `Conflict` if the email is taken.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    /// Exact (case-sensitive) email lookup.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError>;

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

/// Organization and membership persistence.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    async fn organization_name_exists(&self, name: &str) -> Result<bool, StoreError>;

    /// Insert the organization and an admin membership for `admin` atomically.
    ///
    /// Either both rows exist afterwards or neither does.
    async fn create_organization(
        &self,
        new: NewOrganization,
        admin: UserId,
    ) -> Result<(Organization, Membership), StoreError>;

    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError>;

    async fn update_billing_details(
        &self,
        id: OrganizationId,
        billing_details: Option<JsonValue>,
    ) -> Result<Organization, StoreError>;

    async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Membership>, StoreError>;

    /// Membership by id, only if it belongs to `organization_id`.
    async fn find_membership_in_organization(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
    ) -> Result<Option<Membership>, StoreError>;

    /// Organizations `user_id` belongs to, with its role in each, ordered by id.
    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrganizationView>, StoreError>;

    /// Members of an organization with their emails, ordered by membership id.
    async fn list_members(&self, organization_id: OrganizationId) -> Result<Vec<MemberView>, StoreError>;

    async fn add_membership(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<Membership, StoreError>;

    async fn count_admins(&self, organization_id: OrganizationId) -> Result<u64, StoreError>;

    /// Set the role of (`Some`) or remove (`None`) a membership of
    /// `organization_id`, unless that would leave the organization without an
    /// admin.
    ///
    /// The admin count is read and the write applied under one lock, so two
    /// concurrent changes cannot both pass the last-admin check. `NotFound` if
    /// the membership does not belong to the organization.
    async fn change_membership(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
        role: Option<Role>,
    ) -> Result<MembershipChange, StoreError>;
}

/// Everything the services need from one backing store.
pub trait AccountStore: UserStore + OrganizationStore {}

impl<T: UserStore + OrganizationStore> AccountStore for T {}
