//! Infrastructure layer: persistence, configuration and the account services.

pub mod config;
pub mod db;
pub mod services;
pub mod store;


pub use config::{AppConfig, ConfigError};
pub use services::{AuthSession, IdentityService, OrganizationService, ServiceError};
pub use store::{
    AccountStore, InMemoryStore, MembershipChange, OrganizationStore, PostgresStore, StoreError,
    UserStore,
};
