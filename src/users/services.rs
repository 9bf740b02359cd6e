use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::auth::password::PasswordHasher;
use crate::error::{AppError, AppResult};
use crate::users::{
    repo::CredentialStore,
    repo_types::{ProfileFields, User},
};

/// Profile reads and edits. Caller identity is resolved by the handlers
/// from the caller's own token before reaching here.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl ProfileService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// The returned record has an empty `password_hash`.
    pub async fn get_profile(&self, id: i64) -> AppResult<User> {
        let mut user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        user.password_hash.clear();
        Ok(user)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, id: i64, patch: ProfileFields) -> AppResult<()> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        self.store
            .update_profile(id, patch.merged_onto(&current))
            .await?;
        info!("profile updated");
        Ok(())
    }

    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        id: i64,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let current = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !self.hasher.verify(&current.password_hash, old_password)? {
            warn!("password change with invalid old password");
            return Err(AppError::InvalidPassword);
        }

        let hash = self.hasher.hash(new_password)?;
        self.store.update_password_hash(id, &hash).await?;
        info!("password changed");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn add_family_link(&self, id: i64, family_id: i64) -> AppResult<()> {
        self.store.add_family_id(id, family_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_family_link(&self, id: i64, family_id: i64) -> AppResult<()> {
        self.store.remove_family_id(id, family_id).await
    }

    /// Removes the local record only; the cross-service cascade must have run.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.store.delete_user(id).await?;
        info!("user record deleted");
        Ok(())
    }
}
