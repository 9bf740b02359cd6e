use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::json;
use tracing::debug;

use crate::config::FamilyServiceConfig;

/// Failure reported by the relationship service.
#[derive(Debug, thiserror::Error)]
pub enum FamilyClientError {
    /// Transport failure, timeout or server-side fault.
    #[error("family service internal failure: {0}")]
    Internal(String),
    /// The remote side refused the request (e.g. not a member any more).
    #[error("family service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl FamilyClientError {
    pub fn is_internal(&self) -> bool {
        matches!(self, FamilyClientError::Internal(_))
    }
}

/// Operations this service needs from the relationship service.
#[async_trait]
pub trait FamilyClient: Send + Sync {
    async fn remove_user(&self, user_id: i64, family_id: i64) -> Result<(), FamilyClientError>;
    async fn delete_user_invites(&self, user_id: i64) -> Result<(), FamilyClientError>;
}

#[derive(Clone)]
pub struct HttpFamilyClient {
    base: Url,
    client: reqwest::Client,
}

impl HttpFamilyClient {
    pub fn new(cfg: &FamilyServiceConfig) -> anyhow::Result<Self> {
        let mut base = Url::parse(&cfg.url).context("invalid family service URL")?;
        // endpoints are joined relative to the base, keeping any path prefix
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build family service client")?;
        Ok(Self { base, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, FamilyClientError> {
        self.base
            .join(path)
            .map_err(|e| FamilyClientError::Internal(e.to_string()))
    }

    async fn call(&self, path: &str, body: serde_json::Value) -> Result<(), FamilyClientError> {
        let url = self.endpoint(path)?;
        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| FamilyClientError::Internal(e.to_string()))?;

        let status = resp.status();
        debug!(%status, path, "family service answered");
        if status.is_success() {
            return Ok(());
        }
        let message = resp.text().await.unwrap_or_default();
        Err(classify(status, message))
    }
}

fn classify(status: StatusCode, message: String) -> FamilyClientError {
    let unavailable = matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
    );
    if status.is_server_error() || unavailable {
        FamilyClientError::Internal(format!("HTTP {status}: {message}"))
    } else {
        FamilyClientError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl FamilyClient for HttpFamilyClient {
    async fn remove_user(&self, user_id: i64, family_id: i64) -> Result<(), FamilyClientError> {
        self.call(
            "FamilyLeader/RemoveUser",
            json!({ "user_id": user_id, "family_id": family_id }),
        )
        .await
    }

    async fn delete_user_invites(&self, user_id: i64) -> Result<(), FamilyClientError> {
        self.call("Invite/DeleteUserInvites", json!({ "user_id": user_id }))
            .await
    }
}
