use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;

use orgdesk_auth::{ensure_admin_remains, Role, User, UserCredentials};
use orgdesk_core::{Entity, MembershipId, OrganizationId, UserId};
use orgdesk_organizations::{MemberView, Membership, NewOrganization, Organization, OrganizationView};

use super::r#trait::{MembershipChange, OrganizationStore, StoreError, UserStore};

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserCredentials>,
    organizations: BTreeMap<OrganizationId, Organization>,
    memberships: BTreeMap<MembershipId, Membership>,
    last_user_id: i64,
    last_organization_id: i64,
    last_membership_id: i64,
}

impl Tables {
    fn next_user_id(&mut self) -> UserId {
        self.last_user_id += 1;
        UserId::new(self.last_user_id)
    }

    fn next_organization_id(&mut self) -> OrganizationId {
        self.last_organization_id += 1;
        OrganizationId::new(self.last_organization_id)
    }

    fn next_membership_id(&mut self) -> MembershipId {
        self.last_membership_id += 1;
        MembershipId::new(self.last_membership_id)
    }

    fn membership_exists(&self, user_id: UserId, organization_id: OrganizationId) -> bool {
        self.memberships
            .values()
            .any(|m| m.user_id == user_id && m.organization_id == organization_id)
    }

    fn count_admins(&self, organization_id: OrganizationId) -> u64 {
        self.memberships
            .values()
            .filter(|m| m.organization_id == organization_id && m.role.is_admin())
            .count() as u64
    }
}

/// In-memory store for tests/dev.
///
/// All tables sit behind one lock, so every operation (including organization
/// creation) is atomic. Constraints mirror the SQL schema.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.write()?;

        if tables.users.values().any(|u| u.user.email == email) {
            return Err(StoreError::Conflict(format!("users.email '{email}'")));
        }

        let user = User {
            id: tables.next_user_id(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(
            *user.id(),
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.values().find(|u| u.user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let tables = self.read()?;
        Ok(tables.users.get(&id).map(|u| u.user.clone()))
    }
}

#[async_trait]
impl OrganizationStore for InMemoryStore {
    async fn organization_name_exists(&self, name: &str) -> Result<bool, StoreError> {
        let tables = self.read()?;
        Ok(tables.organizations.values().any(|o| o.name == name))
    }

    async fn create_organization(
        &self,
        new: NewOrganization,
        admin: UserId,
    ) -> Result<(Organization, Membership), StoreError> {
        let mut tables = self.write()?;

        // Every check runs before either row is published.
        let name = new.name.into_inner();
        if tables.organizations.values().any(|o| o.name == name) {
            return Err(StoreError::Conflict(format!("organizations.name '{name}'")));
        }
        if !tables.users.contains_key(&admin) {
            return Err(StoreError::ForeignKey(format!(
                "organization_memberships.user_id {admin}"
            )));
        }

        let now = Utc::now();
        let organization = Organization {
            id: tables.next_organization_id(),
            name,
            billing_details: new.billing_details,
            created_at: now,
        };
        let membership = Membership {
            id: tables.next_membership_id(),
            user_id: admin,
            organization_id: organization.id,
            role: Role::Admin,
            created_at: now,
        };

        tables.organizations.insert(*organization.id(), organization.clone());
        tables.memberships.insert(*membership.id(), membership.clone());
        Ok((organization, membership))
    }

    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let tables = self.read()?;
        Ok(tables.organizations.get(&id).cloned())
    }

    async fn update_billing_details(
        &self,
        id: OrganizationId,
        billing_details: Option<JsonValue>,
    ) -> Result<Organization, StoreError> {
        let mut tables = self.write()?;
        let organization = tables.organizations.get_mut(&id).ok_or(StoreError::NotFound)?;
        organization.billing_details = billing_details;
        Ok(organization.clone())
    }

    async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Membership>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .memberships
            .values()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
            .cloned())
    }

    async fn find_membership_in_organization(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
    ) -> Result<Option<Membership>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .memberships
            .get(&membership_id)
            .filter(|m| m.organization_id == organization_id)
            .cloned())
    }

    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrganizationView>, StoreError> {
        let tables = self.read()?;
        let mut views: Vec<OrganizationView> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                tables
                    .organizations
                    .get(&m.organization_id)
                    .map(|o| OrganizationView::new(o.clone(), m.role))
            })
            .collect();
        views.sort_by_key(|v| v.id);
        Ok(views)
    }

    async fn list_members(&self, organization_id: OrganizationId) -> Result<Vec<MemberView>, StoreError> {
        let tables = self.read()?;
        // BTreeMap iteration is already ordered by membership id.
        Ok(tables
            .memberships
            .values()
            .filter(|m| m.organization_id == organization_id)
            .filter_map(|m| {
                tables.users.get(&m.user_id).map(|u| MemberView {
                    id: m.id,
                    user_id: m.user_id,
                    email: u.user.email.clone(),
                    role: m.role,
                    created_at: m.created_at,
                })
            })
            .collect())
    }

    async fn add_membership(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<Membership, StoreError> {
        let mut tables = self.write()?;

        if !tables.organizations.contains_key(&organization_id) {
            return Err(StoreError::ForeignKey(format!(
                "organization_memberships.organization_id {organization_id}"
            )));
        }
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKey(format!(
                "organization_memberships.user_id {user_id}"
            )));
        }
        if tables.membership_exists(user_id, organization_id) {
            return Err(StoreError::Conflict(format!(
                "organization_memberships ({user_id}, {organization_id})"
            )));
        }

        let membership = Membership {
            id: tables.next_membership_id(),
            user_id,
            organization_id,
            role,
            created_at: Utc::now(),
        };
        tables.memberships.insert(*membership.id(), membership.clone());
        Ok(membership)
    }

    async fn count_admins(&self, organization_id: OrganizationId) -> Result<u64, StoreError> {
        Ok(self.read()?.count_admins(organization_id))
    }

    async fn change_membership(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
        role: Option<Role>,
    ) -> Result<MembershipChange, StoreError> {
        let mut tables = self.write()?;

        let target = tables
            .memberships
            .get(&membership_id)
            .filter(|m| m.organization_id == organization_id)
            .cloned()
            .ok_or(StoreError::NotFound)?;
        if ensure_admin_remains(target.role, role, tables.count_admins(organization_id)).is_err() {
            return Ok(MembershipChange::LastAdmin);
        }

        match role {
            Some(role) => {
                let membership = tables
                    .memberships
                    .get_mut(&membership_id)
                    .ok_or(StoreError::NotFound)?;
                membership.role = role;
                Ok(MembershipChange::Applied(membership.clone()))
            }
            None => {
                tables.memberships.remove(&membership_id);
                Ok(MembershipChange::Applied(target))
            }
        }
    }
}
