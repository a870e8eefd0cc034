use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, CandidateProfile, JobId, JobPosting};

/// Read-only view of the job/gig catalog and candidate profiles.
pub trait TalentCatalog: Send + Sync {
    fn job_posting(&self, id: &JobId) -> Result<Option<JobPosting>, CatalogError>;
    fn candidate_profile(
        &self,
        id: &CandidateId,
    ) -> Result<Option<CandidateProfile>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read catalog seed {path}: {source}")]
    SeedIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog seed is not valid JSON: {0}")]
    SeedFormat(#[from] serde_json::Error),
}

/// Seed document for the in-memory catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub jobs: Vec<JobPosting>,
    #[serde(default)]
    pub candidates: Vec<CandidateProfile>,
}
