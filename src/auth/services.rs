use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use super::{jwt::TokenManager, password::PasswordHasher};
use crate::error::{AppError, AppResult};
use crate::users::{
    repo::CredentialStore,
    repo_types::{NewUser, Role},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Longest secret accepted at sign-up and on password change.
pub(crate) const MAX_PASSWORD_BYTES: usize = 72;

pub(crate) fn check_password_length(password: &str) -> AppResult<()> {
    if password.len() >= MAX_PASSWORD_BYTES {
        return Err(AppError::validation("password is too long"));
    }
    Ok(())
}

lazy_static! {
    /// Verified against on unknown emails so both sign-in failures cost one Argon2 run.
    static ref DUMMY_HASH: String = PasswordHasher::default()
        .hash("no-such-account")
        .unwrap_or_default();
}

/// Already-validated sign-up input; `password` is the plain secret.
#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub name: String,
    pub surname: String,
}

/// SignUp / SignIn.
#[derive(Clone)]
pub struct IdentityService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenManager,
}

impl IdentityService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenManager) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn sign_up(&self, input: SignUpInput) -> AppResult<i64> {
        let password_hash = self.hasher.hash(&input.password)?;
        let id = self
            .store
            .create_user(NewUser {
                email: input.email,
                phone_number: input.phone_number,
                name: input.name,
                surname: input.surname,
                password_hash,
                registered_at: OffsetDateTime::now_utc(),
            })
            .await?;
        info!(user_id = id, "user registered");
        Ok(id)
    }

    /// Unknown email and wrong password fail identically with `UserNotFound`.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<String> {
        let Some(user) = self.store.find_by_email(email).await? else {
            let _ = self.hasher.verify(&DUMMY_HASH, password);
            warn!("sign-in for unknown email");
            return Err(AppError::UserNotFound);
        };

        if !self.hasher.verify(&user.password_hash, password)? {
            warn!(user_id = user.id, "sign-in with invalid password");
            return Err(AppError::UserNotFound);
        }

        let token = self.tokens.issue(&user)?;
        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Makes sure an admin account with these credentials exists.
    ///
    /// An existing account is promoted only if it already holds `password`.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> AppResult<i64> {
        let id = match self
            .sign_up(SignUpInput {
                email: email.to_string(),
                password: password.to_string(),
                phone_number: "-".into(),
                name: "admin".into(),
                surname: "admin".into(),
            })
            .await
        {
            Ok(id) => id,
            Err(AppError::UserExists) => {
                let existing = self
                    .store
                    .find_by_email(email)
                    .await?
                    .ok_or(AppError::UserNotFound)?;
                if !self.hasher.verify(&existing.password_hash, password)? {
                    error!(user_id = existing.id, "admin email taken by an account with another password");
                    return Err(AppError::InvalidPassword);
                }
                existing.id
            }
            Err(e) => return Err(e),
        };
        self.store.set_role(id, Role::Admin).await?;
        info!(user_id = id, "admin account ready");
        Ok(id)
    }
}
