use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::authorization::{AccessDenied, AuthorizationGuard, Ownership};
use super::catalog::{CatalogError, TalentCatalog};
use super::domain::{
    ActorRole, Application, ApplicationId, ApplicationPayload, ApplicationStatus, CandidateId,
    CandidateProfile, Identity, JobId, JobPosting, JobStatus,
};
use super::events::{EventEmitter, StatusChanged};
use super::lifecycle::TransitionEdge;
use super::matching::{MatchingEngine, MatchingWeights, ScoreBreakdown};
use super::repository::{rank, ApplicationRepository, RepositoryError};
use super::rescore::{CheckpointError, CheckpointStore, RescoreReport};

/// The only component allowed to create or mutate applications.
///
/// Every mutation is version checked, authorized, validated against the lifecycle graph,
/// persisted with a compare-and-swap, and then announced. Reads are request scoped: nothing
/// is cached between calls.
pub struct ApplicationRegistry<R, C, E> {
    guard: AuthorizationGuard,
    repository: Arc<R>,
    catalog: Arc<C>,
    events: Arc<E>,
    engine: MatchingEngine,
}

impl<R, C, E> ApplicationRegistry<R, C, E>
where
    R: ApplicationRepository + 'static,
    C: TalentCatalog + 'static,
    E: EventEmitter + 'static,
{
    pub fn new(
        repository: Arc<R>,
        catalog: Arc<C>,
        events: Arc<E>,
        weights: MatchingWeights,
    ) -> Self {
        Self {
            guard: AuthorizationGuard,
            repository,
            catalog,
            events,
            engine: MatchingEngine::new(weights),
        }
    }

    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    fn next_application_id(&self) -> ApplicationId {
        ApplicationId(format!("app-{}", Uuid::new_v4().simple()))
    }

    /// Submit a new application for `candidate_id`, attaching a best-effort match score.
    pub fn submit(
        &self,
        identity: &Identity,
        candidate_id: CandidateId,
        job_id: JobId,
        payload: ApplicationPayload,
    ) -> Result<Application, ApplicationServiceError> {
        self.guard.authorize_submit(identity, &candidate_id)?;

        let posting = self.require_posting(&job_id)?;
        if posting.status != JobStatus::Open {
            return Err(ApplicationServiceError::JobClosed(job_id));
        }

        let breakdown = self.initial_score(&candidate_id, &posting);
        let application = Application::submitted(
            self.next_application_id(),
            job_id.clone(),
            candidate_id.clone(),
            payload,
            identity,
            breakdown,
            Utc::now(),
        );

        let stored = self
            .repository
            .insert(application)
            .map_err(|error| match error {
                RepositoryError::ActiveApplicationExists { existing } => {
                    ApplicationServiceError::DuplicateApplication {
                        job_id: job_id.clone(),
                        candidate_id: candidate_id.clone(),
                        existing,
                    }
                }
                other => ApplicationServiceError::Repository(other),
            })?;

        info!(
            application_id = %stored.id,
            job_id = %stored.job_id,
            candidate_id = %stored.candidate_id,
            score = ?stored.score,
            "application submitted"
        );
        self.announce(StatusChanged::for_application(&stored, None));

        Ok(stored)
    }

    /// Move an application along the lifecycle graph.
    pub fn transition(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
        target: ApplicationStatus,
        expected_version: u64,
    ) -> Result<Application, ApplicationServiceError> {
        let current = self.load(application_id)?;
        ensure_version(&current, expected_version)?;

        let ownership = self.ownership_for(identity, &current)?;
        let edge = TransitionEdge::new(current.status, target);
        let grant = self
            .guard
            .authorize_transition(identity, &ownership, edge)
            .map_err(|denied| {
                warn!(
                    application_id = %current.id,
                    actor_id = %identity.actor_id,
                    role = %identity.role,
                    %denied,
                    "transition refused"
                );
                denied
            })?;

        if !edge.is_permitted() {
            return Err(ApplicationServiceError::InvalidTransition {
                from: current.status,
                to: target,
            });
        }

        let next = current.advanced_to(target, identity, grant.is_override, Utc::now());
        let stored = self.persist(next, expected_version)?;

        info!(
            application_id = %stored.id,
            from = %current.status,
            to = %stored.status,
            version = stored.version,
            actor_id = %identity.actor_id,
            is_override = grant.is_override,
            "application transitioned"
        );
        self.announce(StatusChanged::for_application(&stored, Some(current.status)));

        Ok(stored)
    }

    pub fn get(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        let application = self.load(application_id)?;
        let ownership = self.ownership_for(identity, &application)?;
        self.guard.authorize_read(identity, &ownership)?;
        Ok(application)
    }

    /// Applications for a posting, best match first.
    pub fn list_for_job(
        &self,
        identity: &Identity,
        job_id: &JobId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        let posting = self.require_posting(job_id)?;
        self.guard.authorize_job_listing(identity, &posting.employer_id)?;
        Ok(rank(self.repository.for_job(job_id)?))
    }

    pub fn list_for_candidate(
        &self,
        identity: &Identity,
        candidate_id: &CandidateId,
    ) -> Result<Vec<Application>, ApplicationServiceError> {
        self.guard.authorize_candidate_listing(identity, candidate_id)?;
        let mut applications = self.repository.for_candidate(candidate_id)?;
        applications.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(applications)
    }

    /// Score a candidate against a posting without touching any application.
    pub fn preview_match(
        &self,
        identity: &Identity,
        job_id: &JobId,
        candidate_id: &CandidateId,
    ) -> Result<ScoreBreakdown, ApplicationServiceError> {
        let posting = self.require_posting(job_id)?;
        let ownership = Ownership {
            candidate_id: candidate_id.clone(),
            employer_id: Some(posting.employer_id.clone()),
        };
        self.guard.authorize_read(identity, &ownership)?;

        let profile = self.profile_or_empty(candidate_id)?;
        Ok(self.engine.compute(&profile, &posting))
    }

    /// Recompute the score of one application against the posting's current requirements.
    pub fn refresh_score(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
        expected_version: u64,
    ) -> Result<Application, ApplicationServiceError> {
        let current = self.load(application_id)?;
        ensure_version(&current, expected_version)?;

        let posting = self.require_posting(&current.job_id)?;
        let ownership = Ownership {
            candidate_id: current.candidate_id.clone(),
            employer_id: Some(posting.employer_id.clone()),
        };
        self.guard.authorize_rescore(identity, &ownership)?;

        self.rescore_record(&current, &posting)
    }

    /// Batch recomputation over a posting's active applications, checkpointed per id.
    pub fn rescore_job(
        &self,
        identity: &Identity,
        job_id: &JobId,
        run_id: &str,
        checkpoints: &dyn CheckpointStore,
    ) -> Result<RescoreReport, ApplicationServiceError> {
        let posting = self.require_posting(job_id)?;
        self.guard.authorize_job_listing(identity, &posting.employer_id)?;

        let mut report = RescoreReport::new(job_id.clone(), run_id);
        for application in self.repository.for_job(job_id)? {
            if !application.is_active() {
                continue;
            }

            if checkpoints.is_complete(run_id, &application.id)? {
                report.skipped.push(application.id);
                continue;
            }

            match self.rescore_record(&application, &posting) {
                Ok(stored) => {
                    checkpoints.mark_complete(run_id, &stored.id)?;
                    report.rescored.push(stored.id);
                }
                Err(ApplicationServiceError::VersionConflict { .. }) => {
                    report.conflicted.push(application.id);
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            job_id = %job_id,
            run_id,
            rescored = report.rescored.len(),
            skipped = report.skipped.len(),
            conflicted = report.conflicted.len(),
            "rescore pass finished"
        );

        Ok(report)
    }

    fn rescore_record(
        &self,
        current: &Application,
        posting: &JobPosting,
    ) -> Result<Application, ApplicationServiceError> {
        if current.status.is_terminal() {
            return Err(ApplicationServiceError::ScoreFrozen {
                application_id: current.id.clone(),
                status: current.status,
            });
        }

        let profile = self.profile_or_empty(&current.candidate_id)?;
        let breakdown = self.engine.compute(&profile, posting);
        let next = current.rescored(breakdown, Utc::now());
        let stored = self.persist(next, current.version)?;

        debug!(
            application_id = %stored.id,
            score = ?stored.score,
            version = stored.version,
            "application rescored"
        );

        Ok(stored)
    }

    fn load(&self, application_id: &ApplicationId) -> Result<Application, ApplicationServiceError> {
        self.repository.fetch(application_id)?.ok_or_else(|| {
            ApplicationServiceError::NotFound(Missing::Application(application_id.clone()))
        })
    }

    fn persist(
        &self,
        next: Application,
        expected_version: u64,
    ) -> Result<Application, ApplicationServiceError> {
        let application_id = next.id.clone();
        self.repository
            .replace(next, expected_version)
            .map_err(|error| match error {
                RepositoryError::VersionMismatch { expected, actual } => {
                    ApplicationServiceError::VersionConflict { expected, actual }
                }
                RepositoryError::NotFound => {
                    ApplicationServiceError::NotFound(Missing::Application(application_id))
                }
                other => ApplicationServiceError::Repository(other),
            })
    }

    fn require_posting(&self, job_id: &JobId) -> Result<JobPosting, ApplicationServiceError> {
        self.catalog
            .job_posting(job_id)?
            .ok_or_else(|| ApplicationServiceError::NotFound(Missing::Job(job_id.clone())))
    }

    /// Employer ownership needs the posting; other roles never hit the catalog.
    fn ownership_for(
        &self,
        identity: &Identity,
        application: &Application,
    ) -> Result<Ownership, ApplicationServiceError> {
        let employer_id = match identity.role {
            ActorRole::Employer => self
                .catalog
                .job_posting(&application.job_id)?
                .map(|posting| posting.employer_id),
            ActorRole::Candidate | ActorRole::Admin => None,
        };

        Ok(Ownership {
            candidate_id: application.candidate_id.clone(),
            employer_id,
        })
    }

    fn profile_or_empty(
        &self,
        candidate_id: &CandidateId,
    ) -> Result<CandidateProfile, ApplicationServiceError> {
        Ok(self
            .catalog
            .candidate_profile(candidate_id)?
            .unwrap_or_else(|| CandidateProfile::empty(candidate_id.clone())))
    }

    /// Scoring never blocks intake: an unreachable catalog leaves the score empty until an
    /// explicit refresh, and a missing profile scores as low confidence.
    fn initial_score(
        &self,
        candidate_id: &CandidateId,
        posting: &JobPosting,
    ) -> Option<ScoreBreakdown> {
        let profile = match self.catalog.candidate_profile(candidate_id) {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(%candidate_id, "no candidate profile; scoring as low confidence");
                CandidateProfile::empty(candidate_id.clone())
            }
            Err(error) => {
                warn!(%candidate_id, %error, "profile lookup failed; application left unscored");
                return None;
            }
        };

        let breakdown = self.engine.compute(&profile, posting);
        if breakdown.is_approximate() {
            warn!(
                %candidate_id,
                job_id = %posting.id,
                missing = ?breakdown.missing_fields,
                "match score is approximate"
            );
        }
        Some(breakdown)
    }

    fn announce(&self, event: StatusChanged) {
        let event_id = event.event_id.clone();
        if let Err(error) = self.events.emit(event) {
            warn!(%event_id, %error, "status event not emitted");
        }
    }
}

fn ensure_version(current: &Application, expected: u64) -> Result<(), ApplicationServiceError> {
    if current.version == expected {
        Ok(())
    } else {
        Err(ApplicationServiceError::VersionConflict {
            expected,
            actual: current.version,
        })
    }
}

/// Entity a `NotFound` error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Application(ApplicationId),
    Job(JobId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Application(id) => write!(f, "application {id}"),
            Missing::Job(id) => write!(f, "job {id}"),
        }
    }
}

/// Error raised by the application registry.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("candidate {candidate_id} already has active application {existing} for job {job_id}")]
    DuplicateApplication {
        job_id: JobId,
        candidate_id: CandidateId,
        existing: ApplicationId,
    },
    #[error("transition from {from} to {to} is not allowed")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error("version conflict: expected {expected}, current version is {actual}")]
    VersionConflict { expected: u64, actual: u64 },
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] AccessDenied),
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("job {0} is not accepting applications")]
    JobClosed(JobId),
    #[error("score of application {application_id} is frozen once {status}")]
    ScoreFrozen {
        application_id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}
