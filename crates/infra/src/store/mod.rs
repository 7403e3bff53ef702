//! Persistence boundary for users, organizations and memberships.
//!
//! Both implementations enforce the same constraints: unique email, unique
//! organization name, one membership per (user, organization), foreign keys,
//! atomic organization + admin membership creation, and last-admin checks
//! that are applied together with the write they guard.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use r#trait::{AccountStore, MembershipChange, OrganizationStore, StoreError, UserStore};
