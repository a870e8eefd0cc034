use serde::Serialize;

use super::domain::{Application, ApplicationId, ApplicationStatus, CandidateId, JobId};
use super::matching::Confidence;

/// Storage abstraction so the registry can be exercised in isolation.
///
/// Implementations must make `insert` and `replace` atomic: the active-pair check and the
/// version compare-and-swap are what keep concurrent actors from overwriting each other.
pub trait ApplicationRepository: Send + Sync {
    /// Store a new record, refusing it while another active record exists for the same
    /// `(job, candidate)` pair.
    fn insert(&self, application: Application) -> Result<Application, RepositoryError>;

    /// Overwrite a record only if the stored version still equals `expected_version`.
    fn replace(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError>;

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;

    fn for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError>;

    fn for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("active application {existing} already exists for this job and candidate")]
    ActiveApplicationExists { existing: ApplicationId },
    #[error("record already exists")]
    Conflict,
    #[error("stored version {actual} does not match expected {expected}")]
    VersionMismatch { expected: u64, actual: u64 },
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Row of an employer's ranked applicant list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedApplication {
    pub application_id: ApplicationId,
    pub candidate_id: CandidateId,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    pub version: u64,
}

impl From<&Application> for RankedApplication {
    fn from(application: &Application) -> Self {
        Self {
            application_id: application.id.clone(),
            candidate_id: application.candidate_id.clone(),
            status: application.status,
            score: application.score,
            confidence: application
                .score_breakdown
                .as_ref()
                .map(|breakdown| breakdown.confidence),
            version: application.version,
        }
    }
}

/// Ordering used by employer dashboards: best score first, unscored last, then oldest.
pub fn rank(mut applications: Vec<Application>) -> Vec<Application> {
    applications.sort_by(|left, right| {
        right
            .score
            .cmp(&left.score)
            .then_with(|| left.created_at.cmp(&right.created_at))
            .then_with(|| left.id.cmp(&right.id))
    });
    applications
}
