use serde::Serialize;

use super::domain::{ApplicationId, JobId};

/// Progress record for batch rescoring runs, keyed by a caller-chosen run id.
///
/// A restarted run with the same id skips every application already recorded.
pub trait CheckpointStore: Send + Sync {
    fn is_complete(
        &self,
        run_id: &str,
        application_id: &ApplicationId,
    ) -> Result<bool, CheckpointError>;

    fn mark_complete(
        &self,
        run_id: &str,
        application_id: &ApplicationId,
    ) -> Result<(), CheckpointError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint store unavailable: {0}")]
    Unavailable(String),
}

/// Result of one `rescore_job` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RescoreReport {
    pub job_id: JobId,
    pub run_id: String,
    pub rescored: Vec<ApplicationId>,
    /// Already checkpointed by an earlier pass of the same run.
    pub skipped: Vec<ApplicationId>,
    /// Lost a version race; left unrecorded so the next pass retries them.
    pub conflicted: Vec<ApplicationId>,
}

impl RescoreReport {
    pub fn new(job_id: JobId, run_id: impl Into<String>) -> Self {
        Self {
            job_id,
            run_id: run_id.into(),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.conflicted.is_empty()
    }
}
