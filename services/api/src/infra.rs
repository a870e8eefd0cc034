use hireflow::config::CatalogConfig;
use hireflow::error::AppError;
use hireflow::workflows::recruitment::applications::{
    ApplicationRegistry, CandidateId, CandidateProfile, CatalogSeed, ChannelEventEmitter,
    EducationLevel, EmitError, EmployerId, ExperienceRange, InMemoryApplicationRepository,
    InMemoryCatalog, JobId, JobPosting, JobStatus, MatchingWeights, NotificationSink,
    StatusChanged,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

pub(crate) type ServiceRegistry =
    ApplicationRegistry<InMemoryApplicationRepository, InMemoryCatalog, ChannelEventEmitter>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Notification collaborator stand-in: every delivered status change becomes a log line.
#[derive(Debug, Default)]
pub(crate) struct LoggingNotificationSink;

impl NotificationSink for LoggingNotificationSink {
    fn deliver(&self, event: &StatusChanged) -> Result<(), EmitError> {
        info!(
            event_id = %event.event_id,
            application_id = %event.application_id,
            candidate_id = %event.candidate_id,
            old_status = ?event.old_status,
            new_status = %event.new_status,
            actor_id = %event.actor_id,
            "status notification delivered"
        );
        Ok(())
    }
}

pub(crate) fn build_registry(
    catalog: InMemoryCatalog,
    weights: MatchingWeights,
) -> (Arc<ServiceRegistry>, UnboundedReceiver<StatusChanged>) {
    let (emitter, receiver) = ChannelEventEmitter::channel();
    let registry = ApplicationRegistry::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(catalog),
        Arc::new(emitter),
        weights,
    );
    (Arc::new(registry), receiver)
}

/// Seed from `override_path`, then the configured path, then the bundled demo data.
pub(crate) fn load_catalog(
    config: &CatalogConfig,
    override_path: Option<&Path>,
) -> Result<InMemoryCatalog, AppError> {
    match override_path.or(config.seed_path.as_deref()) {
        Some(path) => {
            let catalog = InMemoryCatalog::from_json_file(path)?;
            info!(path = %path.display(), "catalog seeded from file");
            Ok(catalog)
        }
        None => Ok(InMemoryCatalog::from_seed(demo_seed())),
    }
}

pub(crate) const DEMO_JOB: &str = "job-backend";
pub(crate) const DEMO_EMPLOYER: &str = "emp-acme";

pub(crate) fn demo_seed() -> CatalogSeed {
    let skills = |names: &[&str]| -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    };

    CatalogSeed {
        jobs: vec![
            JobPosting {
                id: JobId::new(DEMO_JOB),
                employer_id: EmployerId::new(DEMO_EMPLOYER),
                title: "Backend engineer (payments)".to_string(),
                required_skills: skills(&["Rust", "PostgreSQL", "Kubernetes", "gRPC"]),
                experience_range: ExperienceRange::new(3.0, 7.0),
                education_level: EducationLevel::Bachelor,
                status: JobStatus::Open,
            },
            JobPosting {
                id: JobId::new("job-intern-2023"),
                employer_id: EmployerId::new(DEMO_EMPLOYER),
                title: "Summer intern".to_string(),
                required_skills: skills(&["Python"]),
                experience_range: ExperienceRange::new(0.0, 1.0),
                education_level: EducationLevel::HighSchool,
                status: JobStatus::Closed,
            },
        ],
        candidates: vec![
            CandidateProfile {
                id: CandidateId::new("cand-ada"),
                skills: Some(skills(&["rust", "PostgreSQL", "gRPC", "Kubernetes"])),
                years_experience: Some(5.0),
                education_level: Some(EducationLevel::Master),
            },
            CandidateProfile {
                id: CandidateId::new("cand-lin"),
                skills: Some(skills(&["Rust", "PostgreSQL", "Go"])),
                years_experience: Some(2.0),
                education_level: Some(EducationLevel::Bachelor),
            },
            CandidateProfile {
                id: CandidateId::new("cand-sam"),
                skills: Some(skills(&["Python", "Kubernetes"])),
                years_experience: None,
                education_level: None,
            },
        ],
    }
}
