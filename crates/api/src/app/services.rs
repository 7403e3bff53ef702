use std::sync::Arc;

use orgdesk_auth::AuthConfig;
use orgdesk_infra::{
    db, AccountStore, AppConfig, IdentityService, InMemoryStore, OrganizationService, PostgresStore,
    StoreError,
};

pub type Identity = IdentityService<dyn AccountStore>;
pub type Organizations = OrganizationService<dyn AccountStore>;

/// Services shared by all handlers, backed by one store.
#[derive(Clone)]
pub struct AppServices {
    pub identity: Arc<Identity>,
    pub organizations: Arc<Organizations>,
}

impl AppServices {
    pub fn new(store: Arc<dyn AccountStore>, auth: &AuthConfig) -> Self {
        Self {
            identity: Arc::new(IdentityService::new(store.clone(), auth)),
            organizations: Arc::new(OrganizationService::new(store)),
        }
    }

    /// Process-local store; state is lost on restart.
    pub fn in_memory(auth: &AuthConfig) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), auth)
    }

    /// Postgres when `DATABASE_URL` is configured, in-memory otherwise.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, config.max_connections).await?;
                Ok(Self::new(Arc::new(PostgresStore::new(pool)), &config.auth))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory store");
                Ok(Self::in_memory(&config.auth))
            }
        }
    }
}
