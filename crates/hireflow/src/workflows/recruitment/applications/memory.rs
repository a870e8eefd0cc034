//! Process-local adapters used by the API service, the CLI demo, and tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::catalog::{CatalogError, CatalogSeed, TalentCatalog};
use super::domain::{Application, ApplicationId, CandidateId, CandidateProfile, JobId, JobPosting};
use super::repository::{ApplicationRepository, RepositoryError};
use super::rescore::{CheckpointError, CheckpointStore};

type RecordsGuard<'a> = MutexGuard<'a, BTreeMap<ApplicationId, Application>>;

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("repository mutex poisoned".to_string())
}

fn catalog_poisoned<T>(_: T) -> CatalogError {
    CatalogError::Unavailable("catalog lock poisoned".to_string())
}

/// Mutex-guarded application store. Every check-then-write happens under one lock, which
/// is what makes the active-pair rule and version compare-and-swap atomic.
#[derive(Default, Clone)]
pub struct InMemoryApplicationRepository {
    records: Arc<Mutex<BTreeMap<ApplicationId, Application>>>,
}

impl InMemoryApplicationRepository {
    fn lock(&self) -> Result<RecordsGuard<'_>, RepositoryError> {
        self.records.lock().map_err(poisoned)
    }

    pub fn len(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, RepositoryError> {
        Ok(self.lock()?.is_empty())
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&application.id) {
            return Err(RepositoryError::Conflict);
        }

        if let Some(existing) = guard.values().find(|stored| {
            stored.is_active()
                && stored.job_id == application.job_id
                && stored.candidate_id == application.candidate_id
        }) {
            return Err(RepositoryError::ActiveApplicationExists {
                existing: existing.id.clone(),
            });
        }

        guard.insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn replace(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard
            .get_mut(&application.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                actual: stored.version,
            });
        }

        *stored = application.clone();
        Ok(application)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|application| &application.job_id == job_id)
            .cloned()
            .collect())
    }

    fn for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|application| &application.candidate_id == candidate_id)
            .cloned()
            .collect())
    }
}

/// Catalog stand-in seeded from JSON or built up in code.
#[derive(Default, Clone)]
pub struct InMemoryCatalog {
    jobs: Arc<RwLock<HashMap<JobId, JobPosting>>>,
    candidates: Arc<RwLock<HashMap<CandidateId, CandidateProfile>>>,
}

impl InMemoryCatalog {
    pub fn from_seed(seed: CatalogSeed) -> Self {
        let jobs = seed
            .jobs
            .into_iter()
            .map(|job| (job.id.clone(), job))
            .collect();
        let candidates = seed
            .candidates
            .into_iter()
            .map(|candidate| (candidate.id.clone(), candidate))
            .collect();

        Self {
            jobs: Arc::new(RwLock::new(jobs)),
            candidates: Arc::new(RwLock::new(candidates)),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::SeedIo {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: CatalogSeed = serde_json::from_str(&raw)?;
        Ok(Self::from_seed(seed))
    }

    /// Replace a posting, e.g. after its requirements changed upstream.
    pub fn upsert_job(&self, job: JobPosting) -> Result<(), CatalogError> {
        self.jobs
            .write()
            .map_err(catalog_poisoned)?
            .insert(job.id.clone(), job);
        Ok(())
    }

    pub fn upsert_candidate(&self, candidate: CandidateProfile) -> Result<(), CatalogError> {
        self.candidates
            .write()
            .map_err(catalog_poisoned)?
            .insert(candidate.id.clone(), candidate);
        Ok(())
    }
}

impl TalentCatalog for InMemoryCatalog {
    fn job_posting(&self, id: &JobId) -> Result<Option<JobPosting>, CatalogError> {
        let guard = self
            .jobs
            .read()
            .map_err(catalog_poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn candidate_profile(
        &self,
        id: &CandidateId,
    ) -> Result<Option<CandidateProfile>, CatalogError> {
        let guard = self
            .candidates
            .read()
            .map_err(catalog_poisoned)?;
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCheckpointStore {
    completed: Arc<Mutex<HashSet<(String, ApplicationId)>>>,
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn is_complete(
        &self,
        run_id: &str,
        application_id: &ApplicationId,
    ) -> Result<bool, CheckpointError> {
        let guard = self
            .completed
            .lock()
            .map_err(|_| CheckpointError::Unavailable("checkpoint mutex poisoned".to_string()))?;
        Ok(guard.contains(&(run_id.to_string(), application_id.clone())))
    }

    fn mark_complete(
        &self,
        run_id: &str,
        application_id: &ApplicationId,
    ) -> Result<(), CheckpointError> {
        self.completed
            .lock()
            .map_err(|_| CheckpointError::Unavailable("checkpoint mutex poisoned".to_string()))?
            .insert((run_id.to_string(), application_id.clone()));
        Ok(())
    }
}
