use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{
    interceptor::AccessInterceptor, jwt::TokenManager, password::PasswordHasher,
    policy::AccessPolicy, services::IdentityService,
};
use crate::config::AppConfig;
use crate::db;
use crate::family::{
    client::{FamilyClient, HttpFamilyClient},
    coordinator::FamilyCoordinator,
};
use crate::permissions::PermissionService;
use crate::users::{
    memory::MemoryCredentialStore,
    repo::{CredentialStore, PgCredentialStore},
    services::ProfileService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub tokens: TokenManager,
    pub interceptor: AccessInterceptor,
    pub identity: IdentityService,
    pub profiles: ProfileService,
    pub permissions: PermissionService,
    pub family: FamilyCoordinator,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn CredentialStore> = match &config.database_url {
            Some(url) => Arc::new(PgCredentialStore::new(db::connect(url).await?)),
            None => {
                warn!("DATABASE_URL is not set; using in-memory credential store");
                Arc::new(MemoryCredentialStore::new())
            }
        };
        let family_client = Arc::new(HttpFamilyClient::new(&config.family)?) as Arc<dyn FamilyClient>;

        let state = Self::from_parts(store, family_client, config.clone());

        if let Some(admin) = &config.admin {
            let id = state
                .identity
                .ensure_admin(&admin.email.trim().to_lowercase(), &admin.password)
                .await
                .context("bootstrap admin")?;
            info!(user_id = id, "bootstrap admin in place");
        }

        Ok(state)
    }

    pub fn from_parts(
        store: Arc<dyn CredentialStore>,
        family_client: Arc<dyn FamilyClient>,
        config: Arc<AppConfig>,
    ) -> Self {
        let tokens = TokenManager::new(config.jwt.secret.as_bytes(), config.jwt.token_ttl());
        let hasher = PasswordHasher::new(&config.hash_salt);
        let interceptor =
            AccessInterceptor::new(tokens.clone(), Arc::new(AccessPolicy::standard()));

        let identity = IdentityService::new(store.clone(), hasher.clone(), tokens.clone());
        let profiles = ProfileService::new(store.clone(), hasher);
        let permissions = PermissionService::new(store);
        let family = FamilyCoordinator::new(profiles.clone(), family_client);

        Self {
            config,
            tokens,
            interceptor,
            identity,
            profiles,
            permissions,
            family,
        }
    }

    /// In-memory state with a relationship service that accepts everything.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::{FamilyServiceConfig, JwtConfig};
        use crate::family::client::FamilyClientError;
        use async_trait::async_trait;

        struct AcceptingFamilyClient;
        #[async_trait]
        impl FamilyClient for AcceptingFamilyClient {
            async fn remove_user(&self, _u: i64, _f: i64) -> Result<(), FamilyClientError> {
                Ok(())
            }
            async fn delete_user_invites(&self, _u: i64) -> Result<(), FamilyClientError> {
                Ok(())
            }
        }

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: "test".into(),
                ttl_minutes: 5,
            },
            hash_salt: "pepper".into(),
            family: FamilyServiceConfig {
                url: "http://127.0.0.1:9".into(),
                timeout_secs: 1,
            },
            request_timeout_secs: 5,
            admin: None,
        });

        Self::from_parts(
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(AcceptingFamilyClient),
            config,
        )
    }
}
