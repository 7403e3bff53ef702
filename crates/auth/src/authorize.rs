//! Membership-based authorization policy.
//!
//! - No IO
//! - No panics
//! - Callers look up the membership; this module only decides.

use thiserror::Error;

use crate::Role;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthzError {
    /// No membership in the organization (or the organization does not exist;
    /// the two are deliberately indistinguishable).
    #[error("access denied")]
    AccessDenied,

    #[error("admin role required")]
    AdminRequired,

    #[error("organization must keep at least one admin")]
    LastAdmin,
}

/// Minimum standing required for an organization-scoped operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessLevel {
    Member,
    Admin,
}

/// Decide whether a caller holding `membership` (if any) may act at `required`.
///
/// Returns the caller's role on success.
pub fn authorize(membership: Option<Role>, required: AccessLevel) -> Result<Role, AuthzError> {
    let role = membership.ok_or(AuthzError::AccessDenied)?;
    match (required, role) {
        (AccessLevel::Member, role) => Ok(role),
        (AccessLevel::Admin, Role::Admin) => Ok(Role::Admin),
        (AccessLevel::Admin, Role::Member) => Err(AuthzError::AdminRequired),
    }
}

/// Reject a change that would leave the organization without an admin.
///
/// `next_role` is the target's role after the change, `None` for removal.
/// `admin_count` is the number of admins before the change.
pub fn ensure_admin_remains(
    current_role: Role,
    next_role: Option<Role>,
    admin_count: u64,
) -> Result<(), AuthzError> {
    let loses_admin = current_role.is_admin() && next_role != Some(Role::Admin);
    if loses_admin && admin_count <= 1 {
        return Err(AuthzError::LastAdmin);
    }
    Ok(())
}
