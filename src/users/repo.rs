use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::users::repo_types::{NewUser, ProfileFields, Role, User, UserRow};

/// Persistence contract for user records and the id sequence.
///
/// Implementations translate storage failures into [`AppError`]: duplicate
/// emails surface as `UserExists`, missing ids as `UserNotFound`, anything
/// else as `Internal`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Allocates the next id atomically, stores the user with `Role::User`
    /// and returns the id.
    async fn create_user(&self, user: NewUser) -> AppResult<i64>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    /// Overwrites the four profile fields as given.
    async fn update_profile(&self, id: i64, fields: ProfileFields) -> AppResult<()>;
    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<()>;
    /// Fails with `UserInFamily` if `family_id` is already linked.
    async fn add_family_id(&self, id: i64, family_id: i64) -> AppResult<()>;
    /// Fails with `UserNotInFamily` if `family_id` is not linked.
    async fn remove_family_id(&self, id: i64, family_id: i64) -> AppResult<()>;
    async fn set_role(&self, id: i64, role: Role) -> AppResult<()>;
    async fn delete_user(&self, id: i64) -> AppResult<()>;
}

const USER_COLUMNS: &str =
    "id, email, phone_number, name, surname, password_hash, registered_at, role, family_ids";

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn exists(&self, id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("check user exists")?;
        Ok(found.is_some())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: NewUser) -> AppResult<i64> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let id: i64 = sqlx::query_scalar(
            r#"
            UPDATE counters
               SET value = value + 1
             WHERE name = 'user_id'
            RETURNING value
            "#,
        )
        .fetch_one(&mut *tx)
        .await
        .context("allocate user id")?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, email, phone_number, name, surname, password_hash, registered_at, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&user.password_hash)
        .bind(user.registered_at)
        .bind(Role::User.as_str())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(AppError::UserExists),
            Err(e) => return Err(anyhow::Error::new(e).context("insert user").into()),
        }

        tx.commit().await.context("commit tx")?;
        Ok(id)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        row.map(User::try_from).transpose()
    }

    async fn update_profile(&self, id: i64, fields: ProfileFields) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET email = $2, phone_number = $3, name = $4, surname = $5
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&fields.email)
        .bind(&fields.phone_number)
        .bind(&fields.name)
        .bind(&fields.surname)
        .execute(&self.db)
        .await;

        match res {
            Ok(r) if r.rows_affected() == 0 => Err(AppError::UserNotFound),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(AppError::UserExists),
            Err(e) => Err(anyhow::Error::new(e).context("update profile").into()),
        }
    }

    async fn update_password_hash(&self, id: i64, password_hash: &str) -> AppResult<()> {
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await
            .context("update password hash")?;
        if res.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn add_family_id(&self, id: i64, family_id: i64) -> AppResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET family_ids = array_append(family_ids, $2)
             WHERE id = $1 AND NOT ($2 = ANY(family_ids))
            "#,
        )
        .bind(id)
        .bind(family_id)
        .execute(&self.db)
        .await
        .context("add family id")?;

        if res.rows_affected() == 0 {
            return Err(if self.exists(id).await? {
                AppError::UserInFamily
            } else {
                AppError::UserNotFound
            });
        }
        Ok(())
    }

    async fn remove_family_id(&self, id: i64, family_id: i64) -> AppResult<()> {
        // family_ids never holds duplicates, so array_remove drops exactly one entry
        let res = sqlx::query(
            r#"
            UPDATE users
               SET family_ids = array_remove(family_ids, $2)
             WHERE id = $1 AND $2 = ANY(family_ids)
            "#,
        )
        .bind(id)
        .bind(family_id)
        .execute(&self.db)
        .await
        .context("remove family id")?;

        if res.rows_affected() == 0 {
            return Err(if self.exists(id).await? {
                AppError::UserNotInFamily
            } else {
                AppError::UserNotFound
            });
        }
        Ok(())
    }

    async fn set_role(&self, id: i64, role: Role) -> AppResult<()> {
        let res = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role.as_str())
            .execute(&self.db)
            .await
            .context("set role")?;
        if res.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }

    async fn delete_user(&self, id: i64) -> AppResult<()> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        if res.rows_affected() == 0 {
            return Err(AppError::UserNotFound);
        }
        Ok(())
    }
}
