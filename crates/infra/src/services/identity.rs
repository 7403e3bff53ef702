//! Registration, login and token authentication.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use orgdesk_auth::{
    validate_email_syntax, validate_password_policy, AuthConfig, AuthenticatedIdentity,
    PasswordHasher, TokenService, User,
};

use super::ServiceError;
use crate::store::{StoreError, UserStore};

/// A user together with a freshly issued session token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: User,
    pub token: String,
}

/// Registers and authenticates users.
///
/// Uniqueness and persistence belong to the store, token validity to the
/// signature and expiry. The only state held here is a lazily built dummy hash.
pub struct IdentityService<S: ?Sized> {
    store: Arc<S>,
    hasher: PasswordHasher,
    tokens: TokenService,
    /// Hash checked on unknown-email logins so both failure paths cost one
    /// Argon2 verification. Built lazily with the configured parameters.
    dummy_hash: Arc<OnceCell<String>>,
}

impl<S: ?Sized> Clone for IdentityService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            hasher: self.hasher.clone(),
            tokens: self.tokens.clone(),
            dummy_hash: Arc::clone(&self.dummy_hash),
        }
    }
}

impl<S> IdentityService<S>
where
    S: UserStore + ?Sized,
{
    pub fn new(store: Arc<S>, config: &AuthConfig) -> Self {
        Self {
            store,
            hasher: PasswordHasher::new(config.password.clone()),
            tokens: TokenService::from_config(config),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    #[instrument(skip(self, password), fields(email = %email), err)]
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        if !validate_email_syntax(email) {
            return Err(ServiceError::InvalidEmail);
        }
        validate_password_policy(password)?;

        // Fast path only; the unique constraint decides under concurrency.
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::EmailExists);
        }

        let password_hash = self.hash(password).await?;
        let user = match self.store.insert_user(email, &password_hash).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(ServiceError::EmailExists),
            Err(e) => return Err(e.into()),
        };

        let token = self.tokens.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user registered");
        Ok(AuthSession { user, token })
    }

    /// Unknown email and wrong password fail identically.
    #[instrument(skip(self, password), fields(email = %email), err)]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let Some(credentials) = self.store.find_user_by_email(email).await? else {
            let dummy = self.dummy_hash().await?.to_owned();
            self.verify(password, dummy).await?;
            return Err(ServiceError::InvalidCredentials);
        };

        if !self.verify(password, credentials.password_hash).await? {
            return Err(ServiceError::InvalidCredentials);
        }

        let user = credentials.user;
        let token = self.tokens.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "user logged in");
        Ok(AuthSession { user, token })
    }

    /// Verify a bearer token. Every failure collapses into `NotAuthenticated`.
    #[instrument(skip_all, err)]
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedIdentity, ServiceError> {
        self.tokens
            .verify(token)
            .map(AuthenticatedIdentity::from)
            .map_err(|e| {
                warn!(error = %e, "token rejected");
                ServiceError::NotAuthenticated
            })
    }

    /// The caller's user record; a token for a user that no longer resolves is
    /// treated as unauthenticated.
    #[instrument(skip(self), fields(user_id = %identity.user_id()), err)]
    pub async fn current_user(&self, identity: &AuthenticatedIdentity) -> Result<User, ServiceError> {
        self.store
            .find_user_by_id(identity.user_id())
            .await?
            .ok_or(ServiceError::NotAuthenticated)
    }

    async fn dummy_hash(&self) -> Result<&str, ServiceError> {
        self.dummy_hash
            .get_or_try_init(|| self.hash("unregistered-account-placeholder"))
            .await
            .map(String::as_str)
    }

    async fn hash(&self, password: &str) -> Result<String, ServiceError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "hashing task failed");
                ServiceError::Internal
            })?
            .map_err(Into::into)
    }

    async fn verify(&self, password: &str, hash: String) -> Result<bool, ServiceError> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "verification task failed");
                ServiceError::Internal
            })
    }
}
