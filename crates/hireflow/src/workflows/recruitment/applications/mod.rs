//! Job applications: intake, lifecycle transitions, authorization, and match scoring.
//!
//! `ApplicationRegistry` is the single write path. Storage, the talent catalog, batch
//! checkpoints, and notification delivery sit behind traits so the registry can run against
//! the in-memory adapters here or real backends wired in by the service binary.

pub mod authorization;
pub mod catalog;
pub mod domain;
pub mod events;
pub mod lifecycle;
pub mod matching;
pub mod memory;
pub mod repository;
pub mod rescore;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use authorization::{AccessDenied, AuthorizationGuard};
pub use catalog::{CatalogError, CatalogSeed, TalentCatalog};
pub use domain::{
    ActorId, ActorRole, Application, ApplicationId, ApplicationPayload, ApplicationStatus,
    CandidateId, CandidateProfile, EducationLevel, EmployerId, ExperienceRange, Identity, JobId,
    JobPosting, JobStatus, StatusHistoryEntry,
};
pub use events::{
    ChannelEventEmitter, DispatchStats, EmitError, EventEmitter, NotificationDispatcher,
    NotificationSink, StatusChanged,
};
pub use matching::{Confidence, MatchingEngine, MatchingWeights, ProfileField, ScoreBreakdown};
pub use memory::{InMemoryApplicationRepository, InMemoryCatalog, InMemoryCheckpointStore};
pub use repository::{ApplicationRepository, RankedApplication, RepositoryError};
pub use rescore::{CheckpointError, CheckpointStore, RescoreReport};
pub use router::application_router;
pub use service::{ApplicationRegistry, ApplicationServiceError, Missing};
