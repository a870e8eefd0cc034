use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::workflows::recruitment::applications::catalog::{CatalogError, TalentCatalog};
use crate::workflows::recruitment::applications::domain::{
    Application, ApplicationId, ApplicationPayload, ApplicationStatus, CandidateId,
    CandidateProfile, EducationLevel, EmployerId, ExperienceRange, Identity, JobId, JobPosting,
    JobStatus,
};
use crate::workflows::recruitment::applications::events::{
    EmitError, EventEmitter, StatusChanged,
};
use crate::workflows::recruitment::applications::memory::{
    InMemoryApplicationRepository, InMemoryCatalog, InMemoryCheckpointStore,
};
use crate::workflows::recruitment::applications::repository::{
    ApplicationRepository, RepositoryError,
};
use crate::workflows::recruitment::applications::{
    application_router, ApplicationRegistry, MatchingWeights,
};

pub(super) type MemoryRegistry =
    ApplicationRegistry<InMemoryApplicationRepository, InMemoryCatalog, RecordingEmitter>;

pub(super) fn skills(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub(super) fn job_id() -> JobId {
    JobId::new("job-1")
}

pub(super) fn employer_id() -> EmployerId {
    EmployerId::new("emp-1")
}

pub(super) fn candidate_id() -> CandidateId {
    CandidateId::new("cand-1")
}

/// Posting from the worked scoring example: three skills, 2-5 years, bachelor.
pub(super) fn posting() -> JobPosting {
    JobPosting {
        id: job_id(),
        employer_id: employer_id(),
        title: "Full-stack engineer".to_string(),
        required_skills: skills(&["React", "Node", "SQL"]),
        experience_range: ExperienceRange::new(2.0, 5.0),
        education_level: EducationLevel::Bachelor,
        status: JobStatus::Open,
    }
}

/// Profile matching two of three skills with in-range experience; scores 84.
pub(super) fn profile() -> CandidateProfile {
    CandidateProfile {
        id: candidate_id(),
        skills: Some(skills(&["React", "Node"])),
        years_experience: Some(3.0),
        education_level: Some(EducationLevel::Bachelor),
    }
}

pub(super) fn full_match_profile(id: &str) -> CandidateProfile {
    CandidateProfile {
        id: CandidateId::new(id),
        skills: Some(skills(&["react", "node", "sql"])),
        years_experience: Some(4.0),
        education_level: Some(EducationLevel::Master),
    }
}

pub(super) fn candidate() -> Identity {
    Identity::candidate(&candidate_id())
}

pub(super) fn employer() -> Identity {
    Identity::employer(&employer_id())
}

pub(super) fn admin() -> Identity {
    Identity::admin("ops-1")
}

pub(super) fn seeded_catalog() -> InMemoryCatalog {
    let catalog = InMemoryCatalog::default();
    catalog.upsert_job(posting()).expect("catalog writable");
    catalog.upsert_candidate(profile()).expect("catalog writable");
    catalog
}

pub(super) fn build_registry() -> (
    Arc<MemoryRegistry>,
    Arc<InMemoryApplicationRepository>,
    Arc<InMemoryCatalog>,
    Arc<RecordingEmitter>,
) {
    let repository = Arc::new(InMemoryApplicationRepository::default());
    let catalog = Arc::new(seeded_catalog());
    let events = Arc::new(RecordingEmitter::default());
    let registry = Arc::new(ApplicationRegistry::new(
        repository.clone(),
        catalog.clone(),
        events.clone(),
        MatchingWeights::default(),
    ));
    (registry, repository, catalog, events)
}

pub(super) fn submit_as(registry: &MemoryRegistry, candidate: &CandidateId) -> Application {
    registry
        .submit(
            &Identity::candidate(candidate),
            candidate.clone(),
            job_id(),
            ApplicationPayload::default(),
        )
        .expect("submission succeeds")
}

/// Statuses an admin walks through to reach `status` from `submitted`.
pub(super) fn path_to(status: ApplicationStatus) -> Vec<ApplicationStatus> {
    use ApplicationStatus::*;
    match status {
        Submitted => vec![],
        UnderReview => vec![UnderReview],
        Shortlisted => vec![UnderReview, Shortlisted],
        Interview => vec![UnderReview, Shortlisted, Interview],
        Offered => vec![UnderReview, Shortlisted, Interview, Offered],
        Accepted => vec![UnderReview, Shortlisted, Interview, Offered, Accepted],
        Declined => vec![UnderReview, Shortlisted, Interview, Offered, Declined],
        Rejected => vec![UnderReview, Rejected],
        Withdrawn => vec![Withdrawn],
    }
}

pub(super) fn advance_to<R, C, E>(
    registry: &ApplicationRegistry<R, C, E>,
    application: Application,
    status: ApplicationStatus,
) -> Application
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    path_to(status)
        .into_iter()
        .fold(application, |current, next| {
            registry
                .transition(&admin(), &current.id, next, current.version)
                .expect("admin walks the happy path")
        })
}

#[derive(Default)]
pub(super) struct RecordingEmitter {
    events: Mutex<Vec<StatusChanged>>,
}

impl RecordingEmitter {
    pub(super) fn events(&self) -> Vec<StatusChanged> {
        self.events.lock().expect("emitter mutex poisoned").clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: StatusChanged) -> Result<(), EmitError> {
        self.events
            .lock()
            .expect("emitter mutex poisoned")
            .push(event);
        Ok(())
    }
}

/// Emitter whose downstream is gone; mutations must still succeed.
pub(super) struct ClosedEmitter;

impl EventEmitter for ClosedEmitter {
    fn emit(&self, _event: StatusChanged) -> Result<(), EmitError> {
        Err(EmitError::ChannelClosed)
    }
}

/// Postings resolve but every profile lookup times out.
pub(super) struct ProfileOutageCatalog {
    pub(super) inner: InMemoryCatalog,
}

impl TalentCatalog for ProfileOutageCatalog {
    fn job_posting(&self, id: &JobId) -> Result<Option<JobPosting>, CatalogError> {
        self.inner.job_posting(id)
    }

    fn candidate_profile(
        &self,
        _id: &CandidateId,
    ) -> Result<Option<CandidateProfile>, CatalogError> {
        Err(CatalogError::Unavailable("profile service timeout".to_string()))
    }
}

/// Delegates to memory but reports a lost race when replacing `stale`.
pub(super) struct RacingRepository {
    pub(super) inner: InMemoryApplicationRepository,
    pub(super) stale: ApplicationId,
}

impl ApplicationRepository for RacingRepository {
    fn insert(&self, application: Application) -> Result<Application, RepositoryError> {
        self.inner.insert(application)
    }

    fn replace(
        &self,
        application: Application,
        expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        if application.id == self.stale {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
                actual: expected_version + 1,
            });
        }
        self.inner.replace(application, expected_version)
    }

    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_job(&self, job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.for_job(job_id)
    }

    fn for_candidate(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, RepositoryError> {
        self.inner.for_candidate(candidate_id)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _application: Application) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace(
        &self,
        _application: Application,
        _expected_version: u64,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_job(&self, _job_id: &JobId) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_candidate(
        &self,
        _candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn router_with_registry<R, C, E>(
    registry: Arc<ApplicationRegistry<R, C, E>>,
) -> axum::Router
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    application_router(registry, Arc::new(InMemoryCheckpointStore::default()))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
