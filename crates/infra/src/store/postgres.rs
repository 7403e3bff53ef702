//! Postgres-backed account store.
//!
//! ## Error Mapping
//!
//! | PostgreSQL Error Code | StoreError | Scenario |
//! |----------------------|------------|----------|
//! | `23505` | `Conflict` | Duplicate email, organization name or membership |
//! | `23503` | `ForeignKey` | Membership references a missing user/organization |
//! | Any other / non-database | `Backend` | Connection failures, pool closed, bad rows |
//!
//! Uniqueness is enforced by the schema, so concurrent writers racing past an
//! application-level pre-check still end up with exactly one winner. The
//! last-admin rule has no schema constraint; `change_membership` instead locks
//! the organization's admin rows for the duration of its transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use orgdesk_auth::{ensure_admin_remains, Role, User, UserCredentials};
use orgdesk_core::{MembershipId, OrganizationId, UserId};
use orgdesk_organizations::{MemberView, Membership, NewOrganization, Organization, OrganizationView};

use super::r#trait::{MembershipChange, OrganizationStore, StoreError, UserStore};

/// Postgres implementation of [`UserStore`] and [`OrganizationStore`].
///
/// Cheap to clone: `PgPool` is reference counted internally.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, password_hash), fields(email = %email), err)]
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(row.into_credentials().user)
    }

    #[instrument(skip(self), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredentials>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        Ok(row.map(UserRow::into_credentials))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        Ok(row.map(|r| r.into_credentials().user))
    }
}

#[async_trait]
impl OrganizationStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn organization_name_exists(&self, name: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM organizations WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("organization_name_exists", e))?;
        Ok(exists)
    }

    /// Both inserts share one transaction; an early return drops `tx`, which
    /// rolls it back.
    #[instrument(skip(self, new), fields(name = %new.name.as_str(), admin = %admin), err)]
    async fn create_organization(
        &self,
        new: NewOrganization,
        admin: UserId,
    ) -> Result<(Organization, Membership), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("create_organization.begin", e))?;

        let organization = sqlx::query_as::<_, OrganizationRow>(
            r#"
            INSERT INTO organizations (name, billing_details)
            VALUES ($1, $2)
            RETURNING id, name, billing_details, created_at
            "#,
        )
        .bind(new.name.as_str())
        .bind(new.billing_details)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_organization.organization", e))?;

        let membership = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO organization_memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, organization_id, role, created_at
            "#,
        )
        .bind(admin.get())
        .bind(organization.id)
        .bind(Role::Admin.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_organization.membership", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("create_organization.commit", e))?;

        Ok((organization.into(), Membership::try_from(membership)?))
    }

    #[instrument(skip(self), fields(organization_id = %id), err)]
    async fn find_organization(&self, id: OrganizationId) -> Result<Option<Organization>, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT id, name, billing_details, created_at FROM organizations WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_organization", e))?;

        Ok(row.map(Organization::from))
    }

    #[instrument(skip(self, billing_details), fields(organization_id = %id), err)]
    async fn update_billing_details(
        &self,
        id: OrganizationId,
        billing_details: Option<JsonValue>,
    ) -> Result<Organization, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            r#"
            UPDATE organizations
            SET billing_details = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, billing_details, created_at
            "#,
        )
        .bind(id.get())
        .bind(billing_details)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_billing_details", e))?;

        row.map(Organization::from).ok_or(StoreError::NotFound)
    }

    #[instrument(skip(self), fields(user_id = %user_id, organization_id = %organization_id), err)]
    async fn find_membership(
        &self,
        user_id: UserId,
        organization_id: OrganizationId,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM organization_memberships
            WHERE user_id = $1 AND organization_id = $2
            "#,
        )
        .bind(user_id.get())
        .bind(organization_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_membership", e))?;

        row.map(Membership::try_from).transpose()
    }

    #[instrument(
        skip(self),
        fields(organization_id = %organization_id, membership_id = %membership_id),
        err
    )]
    async fn find_membership_in_organization(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM organization_memberships
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(membership_id.get())
        .bind(organization_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_membership_in_organization", e))?;

        row.map(Membership::try_from).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_organizations_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrganizationView>, StoreError> {
        let rows = sqlx::query_as::<_, OrganizationViewRow>(
            r#"
            SELECT o.id, o.name, o.billing_details, o.created_at, m.role
            FROM organizations o
            JOIN organization_memberships m ON m.organization_id = o.id
            WHERE m.user_id = $1
            ORDER BY o.id ASC
            "#,
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_organizations_for_user", e))?;

        rows.into_iter().map(OrganizationView::try_from).collect()
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    async fn list_members(&self, organization_id: OrganizationId) -> Result<Vec<MemberView>, StoreError> {
        let rows = sqlx::query_as::<_, MemberViewRow>(
            r#"
            SELECT m.id, m.user_id, u.email, m.role, m.created_at
            FROM organization_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.id ASC
            "#,
        )
        .bind(organization_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_members", e))?;

        rows.into_iter().map(MemberView::try_from).collect()
    }

    #[instrument(
        skip(self),
        fields(organization_id = %organization_id, user_id = %user_id, role = %role),
        err
    )]
    async fn add_membership(
        &self,
        organization_id: OrganizationId,
        user_id: UserId,
        role: Role,
    ) -> Result<Membership, StoreError> {
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            INSERT INTO organization_memberships (user_id, organization_id, role)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, organization_id, role, created_at
            "#,
        )
        .bind(user_id.get())
        .bind(organization_id.get())
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("add_membership", e))?;

        Membership::try_from(row)
    }

    #[instrument(skip(self), fields(organization_id = %organization_id), err)]
    async fn count_admins(&self, organization_id: OrganizationId) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM organization_memberships
            WHERE organization_id = $1 AND role = 'admin'
            "#,
        )
        .bind(organization_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_admins", e))?;

        u64::try_from(count).map_err(|e| StoreError::Backend(format!("negative admin count: {e}")))
    }

    /// Returning early drops `tx`, which rolls back and releases the locks.
    #[instrument(
        skip(self),
        fields(organization_id = %organization_id, membership_id = %membership_id, role = ?role),
        err
    )]
    async fn change_membership(
        &self,
        organization_id: OrganizationId,
        membership_id: MembershipId,
        role: Option<Role>,
    ) -> Result<MembershipChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("change_membership.begin", e))?;

        // Id order keeps concurrent lockers from deadlocking. A writer blocked
        // here re-reads the rows after the holder commits.
        let admin_ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT id
            FROM organization_memberships
            WHERE organization_id = $1 AND role = 'admin'
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(organization_id.get())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("change_membership.lock_admins", e))?;

        let target = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT id, user_id, organization_id, role, created_at
            FROM organization_memberships
            WHERE id = $1 AND organization_id = $2
            FOR UPDATE
            "#,
        )
        .bind(membership_id.get())
        .bind(organization_id.get())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("change_membership.target", e))?
        .ok_or(StoreError::NotFound)?;
        let target = Membership::try_from(target)?;

        if ensure_admin_remains(target.role, role, admin_ids.len() as u64).is_err() {
            return Ok(MembershipChange::LastAdmin);
        }

        let changed = match role {
            Some(role) => {
                let row = sqlx::query_as::<_, MembershipRow>(
                    r#"
                    UPDATE organization_memberships
                    SET role = $2, updated_at = NOW()
                    WHERE id = $1
                    RETURNING id, user_id, organization_id, role, created_at
                    "#,
                )
                .bind(membership_id.get())
                .bind(role.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("change_membership.update", e))?;
                Membership::try_from(row)?
            }
            None => {
                sqlx::query("DELETE FROM organization_memberships WHERE id = $1")
                    .bind(membership_id.get())
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("change_membership.delete", e))?;
                target
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("change_membership.commit", e))?;

        Ok(MembershipChange::Applied(changed))
    }
}

/// Map SQLx errors to `StoreError` with appropriate error types.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23503") => StoreError::ForeignKey(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    raw.parse()
        .map_err(|e| StoreError::Backend(format!("corrupt membership row: {e}")))
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_credentials(self) -> UserCredentials {
        UserCredentials {
            user: User {
                id: UserId::new(self.id),
                email: self.email,
                created_at: self.created_at,
            },
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct OrganizationRow {
    id: i64,
    name: String,
    billing_details: Option<JsonValue>,
    created_at: DateTime<Utc>,
}

impl From<OrganizationRow> for Organization {
    fn from(row: OrganizationRow) -> Self {
        Organization {
            id: OrganizationId::new(row.id),
            name: row.name,
            billing_details: row.billing_details,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct MembershipRow {
    id: i64,
    user_id: i64,
    organization_id: i64,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = StoreError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            id: MembershipId::new(row.id),
            user_id: UserId::new(row.user_id),
            organization_id: OrganizationId::new(row.organization_id),
            role: parse_role(&row.role)?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct OrganizationViewRow {
    id: i64,
    name: String,
    billing_details: Option<JsonValue>,
    created_at: DateTime<Utc>,
    role: String,
}

impl TryFrom<OrganizationViewRow> for OrganizationView {
    type Error = StoreError;

    fn try_from(row: OrganizationViewRow) -> Result<Self, Self::Error> {
        let role = parse_role(&row.role)?;
        let organization = Organization {
            id: OrganizationId::new(row.id),
            name: row.name,
            billing_details: row.billing_details,
            created_at: row.created_at,
        };
        Ok(OrganizationView::new(organization, role))
    }
}

#[derive(FromRow)]
struct MemberViewRow {
    id: i64,
    user_id: i64,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MemberViewRow> for MemberView {
    type Error = StoreError;

    fn try_from(row: MemberViewRow) -> Result<Self, Self::Error> {
        Ok(MemberView {
            id: MembershipId::new(row.id),
            user_id: UserId::new(row.user_id),
            email: row.email,
            role: parse_role(&row.role)?,
            created_at: row.created_at,
        })
    }
}
