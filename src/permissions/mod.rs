use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::{repo::CredentialStore, repo_types::Role};

/// Role lookups.
#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn CredentialStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn is_admin(&self, id: i64) -> AppResult<bool> {
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        Ok(user.role == Role::Admin)
    }
}

#[derive(Debug, Deserialize)]
pub struct IsAdminRequest {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/Permissions/IsAdmin", post(is_admin))
}

#[instrument(skip(state))]
pub async fn is_admin(
    State(state): State<AppState>,
    Json(req): Json<IsAdminRequest>,
) -> AppResult<Json<IsAdminResponse>> {
    let is_admin = state.permissions.is_admin(req.user_id).await?;
    Ok(Json(IsAdminResponse { is_admin }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::MemoryCredentialStore, repo_types::NewUser};
    use time::OffsetDateTime;

    #[tokio::test]
    async fn is_admin_reflects_role() {
        let store = Arc::new(MemoryCredentialStore::new());
        let id = store
            .create_user(NewUser {
                email: "a@x.com".into(),
                phone_number: "1".into(),
                name: "a".into(),
                surname: "b".into(),
                password_hash: "h".into(),
                registered_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();
        let perms = PermissionService::new(store.clone());
        assert!(!perms.is_admin(id).await.unwrap());
        store.set_role(id, Role::Admin).await.unwrap();
        assert!(perms.is_admin(id).await.unwrap());
        assert!(matches!(
            perms.is_admin(id + 5).await.unwrap_err(),
            AppError::UserNotFound
        ));
    }
}
