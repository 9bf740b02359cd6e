use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Salted Argon2 hashing with the default work factor.
///
/// Every secret gets the configured salt suffix appended before hashing and
/// verification, so the same transform applies at sign-up and sign-in.
#[derive(Clone, Default)]
pub struct PasswordHasher {
    hash_salt: String,
}

impl PasswordHasher {
    pub fn new(hash_salt: impl Into<String>) -> Self {
        Self {
            hash_salt: hash_salt.into(),
        }
    }

    fn salted(&self, plain: &str) -> String {
        format!("{plain}{}", self.hash_salt)
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(self.salted(plain).as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, hash: &str, plain: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow::anyhow!(e.to_string())
        })?;
        Ok(Argon2::default()
            .verify_password(self.salted(plain).as_bytes(), &parsed)
            .is_ok())
    }
}
