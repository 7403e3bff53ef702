//! Organizations and memberships (multi-tenant data model).

pub mod membership;
pub mod organization;

pub use membership::{MemberView, Membership};
pub use organization::{NewOrganization, Organization, OrganizationView};
