//! Organization lifecycle and membership management.
//!
//! Every organization-scoped operation starts with [`OrganizationService::check_access`]
//! (or its admin variant). A missing membership yields `AccessDenied` whether or
//! not the organization exists, so callers cannot discover foreign tenants.

use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, instrument};

use orgdesk_auth::{authorize, AccessLevel, AuthenticatedIdentity, Role};
use orgdesk_core::{MembershipId, OrganizationId, OrganizationName};
use orgdesk_organizations::{MemberView, Membership, NewOrganization, OrganizationView};

use super::ServiceError;
use crate::store::{AccountStore, MembershipChange, StoreError};

pub struct OrganizationService<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for OrganizationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> OrganizationService<S>
where
    S: AccountStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Create an organization with the caller as its first admin.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()), err)]
    pub async fn create(
        &self,
        identity: &AuthenticatedIdentity,
        name: &str,
    ) -> Result<OrganizationView, ServiceError> {
        let name = OrganizationName::parse(name).map_err(|_| ServiceError::InvalidName)?;

        if self.store.organization_name_exists(name.as_str()).await? {
            return Err(ServiceError::NameExists);
        }

        let (organization, membership) = match self
            .store
            .create_organization(NewOrganization::new(name), identity.user_id())
            .await
        {
            Ok(created) => created,
            Err(StoreError::Conflict(_)) => return Err(ServiceError::NameExists),
            // The token outlived its user.
            Err(StoreError::ForeignKey(_)) => return Err(ServiceError::NotAuthenticated),
            Err(e) => return Err(e.into()),
        };

        info!(organization_id = %organization.id, "organization created");
        Ok(OrganizationView::new(organization, membership.role))
    }

    /// Organizations the caller belongs to, ordered by id.
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id()), err)]
    pub async fn list(
        &self,
        identity: &AuthenticatedIdentity,
    ) -> Result<Vec<OrganizationView>, ServiceError> {
        Ok(self.store.list_organizations_for_user(identity.user_id()).await?)
    }

    /// Read-only: the "current organization" lives with the client.
    #[instrument(
        skip(self, identity),
        fields(user_id = %identity.user_id(), organization_id = %organization_id),
        err
    )]
    pub async fn switch(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
    ) -> Result<OrganizationView, ServiceError> {
        let role = self.check_access(identity, organization_id).await?;
        let organization = self
            .store
            .find_organization(organization_id)
            .await?
            .ok_or(ServiceError::AccessDenied)?;
        Ok(OrganizationView::new(organization, role))
    }

    /// The caller's role in `organization_id`, or `AccessDenied`.
    pub async fn check_access(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
    ) -> Result<Role, ServiceError> {
        self.require(identity, organization_id, AccessLevel::Member).await
    }

    #[instrument(
        skip(self, identity),
        fields(user_id = %identity.user_id(), organization_id = %organization_id),
        err
    )]
    pub async fn list_members(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
    ) -> Result<Vec<MemberView>, ServiceError> {
        self.require(identity, organization_id, AccessLevel::Admin).await?;
        Ok(self.store.list_members(organization_id).await?)
    }

    /// Add an existing user, looked up by email, to the organization.
    #[instrument(
        skip(self, identity),
        fields(user_id = %identity.user_id(), organization_id = %organization_id),
        err
    )]
    pub async fn add_member(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
        email: &str,
        role: &str,
    ) -> Result<Membership, ServiceError> {
        self.require(identity, organization_id, AccessLevel::Admin).await?;
        let role = parse_role(role)?;

        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound)?
            .user;

        let membership = match self.store.add_membership(organization_id, user.id, role).await {
            Ok(membership) => membership,
            Err(StoreError::Conflict(_)) => return Err(ServiceError::AlreadyMember),
            Err(StoreError::ForeignKey(_)) => return Err(ServiceError::NotFound),
            Err(e) => return Err(e.into()),
        };

        info!(membership_id = %membership.id, member = %user.id, %role, "member added");
        Ok(membership)
    }

    /// Change a member's role. Demoting the only admin is rejected like removal.
    #[instrument(
        skip(self, identity),
        fields(user_id = %identity.user_id(), organization_id = %organization_id, membership_id = %membership_id),
        err
    )]
    pub async fn update_member_role(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
        membership_id: MembershipId,
        new_role: &str,
    ) -> Result<Membership, ServiceError> {
        self.require(identity, organization_id, AccessLevel::Admin).await?;
        let new_role = parse_role(new_role)?;
        let target = self.membership_in(organization_id, membership_id).await?;

        if target.role == new_role {
            return Ok(target);
        }

        let updated = self
            .change(organization_id, membership_id, Some(new_role))
            .await?;

        info!(from = %target.role, to = %new_role, "member role updated");
        Ok(updated)
    }

    #[instrument(
        skip(self, identity),
        fields(user_id = %identity.user_id(), organization_id = %organization_id, membership_id = %membership_id),
        err
    )]
    pub async fn remove_member(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
        membership_id: MembershipId,
    ) -> Result<(), ServiceError> {
        self.require(identity, organization_id, AccessLevel::Admin).await?;
        let removed = self.change(organization_id, membership_id, None).await?;

        info!(member = %removed.user_id, "member removed");
        Ok(())
    }

    /// Replace the billing blob; `None` clears it.
    #[instrument(
        skip(self, identity, billing_details),
        fields(user_id = %identity.user_id(), organization_id = %organization_id),
        err
    )]
    pub async fn update_billing_details(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
        billing_details: Option<JsonValue>,
    ) -> Result<OrganizationView, ServiceError> {
        let role = self.require(identity, organization_id, AccessLevel::Admin).await?;
        let organization = self
            .store
            .update_billing_details(organization_id, billing_details)
            .await
            .map_err(not_found_or_internal)?;

        info!("billing details updated");
        Ok(OrganizationView::new(organization, role))
    }

    async fn require(
        &self,
        identity: &AuthenticatedIdentity,
        organization_id: OrganizationId,
        level: AccessLevel,
    ) -> Result<Role, ServiceError> {
        let membership = self
            .store
            .find_membership(identity.user_id(), organization_id)
            .await?;
        Ok(authorize(membership.map(|m| m.role), level)?)
    }

    /// Role change or removal; the store applies the last-admin rule under
    /// the same lock as the write.
    async fn change(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
        role: Option<Role>,
    ) -> Result<Membership, ServiceError> {
        match self
            .store
            .change_membership(organization_id, membership_id, role)
            .await
            .map_err(not_found_or_internal)?
        {
            MembershipChange::Applied(membership) => Ok(membership),
            MembershipChange::LastAdmin => Err(ServiceError::LastAdmin),
        }
    }

    async fn membership_in(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
    ) -> Result<Membership, ServiceError> {
        self.store
            .find_membership_in_organization(organization_id, membership_id)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}

fn parse_role(raw: &str) -> Result<Role, ServiceError> {
    raw.parse().map_err(|_| ServiceError::InvalidRole)
}

/// A row that vanished between lookup and write (concurrent removal).
fn not_found_or_internal(err: StoreError) -> ServiceError {
    match err {
        StoreError::NotFound => ServiceError::NotFound,
        other => other.into(),
    }
}
