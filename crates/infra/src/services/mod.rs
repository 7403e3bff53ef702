//! Identity and organization services.
//!
//! Both are generic over their store so the same code runs against
//! [`crate::store::InMemoryStore`] in tests and [`crate::store::PostgresStore`]
//! in production, or behind `dyn AccountStore`.

pub mod error;
pub mod identity;
pub mod organization;

pub use error::ServiceError;
pub use identity::{AuthSession, IdentityService};
pub use organization::OrganizationService;
