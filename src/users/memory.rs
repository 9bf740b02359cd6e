use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::users::repo::CredentialStore;
use crate::users::repo_types::{NewUser, ProfileFields, Role, User};

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryCredentialStore {
    seq: AtomicI64,
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, user: NewUser) -> AppResult<i64> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::UserExists);
        }
        let id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        users.insert(
            id,
            User {
                id,
                email: user.email,
                phone_number: user.phone_number,
                name: user.name,
                surname: user.surname,
                password_hash: user.password_hash,
                registered_at: user.registered_at,
                role: Role::User,
                family_ids: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn update_profile(&self, id: i64, fields: ProfileFields) -> AppResult<()> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && u.email == fields.email)
        {
            return Err(AppError::UserExists);
        }
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound)?;
        user.email = fields.email;
        user.phone_number = fields.phone_number;
        user.name = fields.name;
        user.surname = fields.surname;
        Ok(())
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn add_family_id(&self, id: i64, family_id: i64) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound)?;
        if user.family_ids.contains(&family_id) {
            return Err(AppError::UserInFamily);
        }
        user.family_ids.push(family_id);
        Ok(())
    }

    async fn remove_family_id(&self, id: i64, family_id: i64) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound)?;
        let pos = user
            .family_ids
            .iter()
            .position(|f| *f == family_id)
            .ok_or(AppError::UserNotInFamily)?;
        user.family_ids.remove(pos);
        Ok(())
    }

    async fn set_role(&self, id: i64, role: Role) -> AppResult<()> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(AppError::UserNotFound)?;
        user.role = role;
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            phone_number: "+375000000".into(),
            name: "Name".into(),
            surname: "Surname".into(),
            password_hash: "hash".into(),
            registered_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn ids_are_strictly_increasing() {
        let store = MemoryCredentialStore::new();
        let mut last = 0;
        for i in 0..5 {
            let id = store
                .create_user(new_user(&format!("u{i}@x.com")))
                .await
                .expect("create");
            assert!(id > last);
            last = id;
        }
    }

    #[tokio::test]
    async fn concurrent_creation_never_reuses_ids() {
        let store = Arc::new(MemoryCredentialStore::new());
        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.create_user(new_user(&format!("c{i}@x.com"))).await
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().expect("create"));
        }
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 32);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_id_not_consumed() {
        let store = MemoryCredentialStore::new();
        let first = store.create_user(new_user("a@x.com")).await.unwrap();
        let err = store.create_user(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::UserExists));
        let next = store.create_user(new_user("b@x.com")).await.unwrap();
        assert_eq!(next, first + 1);
    }

    #[tokio::test]
    async fn new_users_get_user_role_and_no_families() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user(new_user("a@x.com")).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().expect("present");
        assert_eq!(user.role, Role::User);
        assert!(user.family_ids.is_empty());
    }

    #[tokio::test]
    async fn family_removal_preserves_order() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user(new_user("a@x.com")).await.unwrap();
        for f in [10, 20, 30] {
            store.add_family_id(id, f).await.unwrap();
        }
        store.remove_family_id(id, 20).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.family_ids, vec![10, 30]);

        store.remove_family_id(id, 10).await.unwrap();
        store.remove_family_id(id, 30).await.unwrap();
        let user = store.find_by_id(id).await.unwrap().unwrap();
        assert!(user.family_ids.is_empty());
    }

    #[tokio::test]
    async fn family_edits_on_missing_user() {
        let store = MemoryCredentialStore::new();
        assert!(matches!(
            store.add_family_id(99, 1).await.unwrap_err(),
            AppError::UserNotFound
        ));
        assert!(matches!(
            store.remove_family_id(99, 1).await.unwrap_err(),
            AppError::UserNotFound
        ));
    }

    #[tokio::test]
    async fn profile_update_rejects_taken_email() {
        let store = MemoryCredentialStore::new();
        store.create_user(new_user("a@x.com")).await.unwrap();
        let b = store.create_user(new_user("b@x.com")).await.unwrap();
        let err = store
            .update_profile(
                b,
                ProfileFields {
                    email: "a@x.com".into(),
                    phone_number: "1".into(),
                    name: "n".into(),
                    surname: "s".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserExists));
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let store = MemoryCredentialStore::new();
        let id = store.create_user(new_user("a@x.com")).await.unwrap();
        store.delete_user(id).await.unwrap();
        assert!(matches!(
            store.delete_user(id).await.unwrap_err(),
            AppError::UserNotFound
        ));
    }
}
