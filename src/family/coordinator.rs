//! Cascading deletion of a user across this service and the relationship
//! service.
//!
//! The deletion runs as an ordered list of stages. Every stage carries its
//! own error policy, and the local record is only removed by the last one,
//! so an aborted run leaves the user intact and can be retried from the top.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::client::{FamilyClient, FamilyClientError};
use crate::error::{AppError, AppResult};
use crate::users::{repo_types::User, services::ProfileService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Any failure aborts the deletion.
    Fatal,
    /// Internal failures abort; rejections are logged and skipped.
    TolerateRejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    RemoveFromFamily(i64),
    DeleteInvites,
    DeleteLocal,
}

impl Stage {
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            Stage::RemoveFromFamily(_) => ErrorPolicy::TolerateRejected,
            Stage::DeleteInvites | Stage::DeleteLocal => ErrorPolicy::Fatal,
        }
    }
}

#[derive(Clone)]
pub struct FamilyCoordinator {
    profiles: ProfileService,
    client: Arc<dyn FamilyClient>,
}

impl FamilyCoordinator {
    pub fn new(profiles: ProfileService, client: Arc<dyn FamilyClient>) -> Self {
        Self { profiles, client }
    }

    pub fn plan(user: &User) -> Vec<Stage> {
        user.family_ids
            .iter()
            .map(|f| Stage::RemoveFromFamily(*f))
            .chain([Stage::DeleteInvites, Stage::DeleteLocal])
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn delete_user_everywhere(&self, user_id: i64) -> AppResult<()> {
        let user = self.profiles.get_profile(user_id).await?;
        let stages = Self::plan(&user);
        info!(stages = stages.len(), "deleting user everywhere");

        for stage in stages {
            match stage {
                Stage::DeleteLocal => self.profiles.delete_user(user_id).await?,
                remote => {
                    if let Err(e) = self.run_remote(user_id, remote).await {
                        self.handle_remote_failure(user_id, remote, e)?;
                    }
                }
            }
        }

        info!("user deleted everywhere");
        Ok(())
    }

    async fn run_remote(&self, user_id: i64, stage: Stage) -> Result<(), FamilyClientError> {
        match stage {
            Stage::RemoveFromFamily(family_id) => self.client.remove_user(user_id, family_id).await,
            Stage::DeleteInvites => self.client.delete_user_invites(user_id).await,
            Stage::DeleteLocal => Ok(()),
        }
    }

    fn handle_remote_failure(
        &self,
        user_id: i64,
        stage: Stage,
        err: FamilyClientError,
    ) -> AppResult<()> {
        if stage.policy() == ErrorPolicy::TolerateRejected && !err.is_internal() {
            warn!(user_id, ?stage, error = %err, "tolerated family service failure");
            return Ok(());
        }
        error!(user_id, ?stage, error = %err, "deletion aborted");
        Err(AppError::Internal(
            anyhow::Error::new(err).context(format!("stage {stage:?}")),
        ))
    }
}
