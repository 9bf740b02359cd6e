use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Tokens never outlive a year, whatever JWT_TTL_MINUTES says.
const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    pub fn new(secret: String, ttl_minutes: i64) -> anyhow::Result<Self> {
        if secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        Ok(Self {
            secret,
            ttl_minutes,
        })
    }

    /// Clamped to between one minute and [`MAX_TTL_MINUTES`].
    pub fn token_ttl(&self) -> Duration {
        let minutes = self.ttl_minutes.clamp(1, MAX_TTL_MINUTES) as u64;
        Duration::from_secs(minutes * 60)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FamilyServiceConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hash_salt: String,
    pub family: FamilyServiceConfig,
    pub request_timeout_secs: u64,
    pub admin: Option<AdminBootstrap>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig::new(
            std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            env_or("JWT_TTL_MINUTES", 60),
        )?;
        let family = FamilyServiceConfig {
            url: std::env::var("FAMILY_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8081".into()),
            timeout_secs: env_or("FAMILY_TIMEOUT_SECS", 5),
        };
        let admin = match (std::env::var("ADMIN_EMAIL"), std::env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.is_empty() && !password.is_empty() => {
                Some(AdminBootstrap { email, password })
            }
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            hash_salt: std::env::var("HASH_SALT").unwrap_or_default(),
            family,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 10),
            admin,
        })
    }
}
