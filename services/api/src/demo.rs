use crate::infra::{build_registry, load_catalog, DEMO_EMPLOYER, DEMO_JOB};
use clap::Args;
use hireflow::config::AppConfig;
use hireflow::error::AppError;
use hireflow::workflows::recruitment::applications::{
    ActorRole, ApplicationPayload, ApplicationServiceError, ApplicationStatus, CandidateId,
    CandidateProfile, EmitError, EmployerId, Identity, InMemoryCheckpointStore, JobId,
    MatchingEngine, NotificationDispatcher, NotificationSink, StatusChanged, TalentCatalog,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// JSON catalog seed; defaults to the bundled demo postings and profiles.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Posting to run the demo against.
    #[arg(long, default_value = DEMO_JOB)]
    pub(crate) job: String,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Posting identifier
    #[arg(long)]
    pub(crate) job: String,
    /// Candidate profile identifier
    #[arg(long)]
    pub(crate) candidate: String,
    /// JSON catalog seed; defaults to APP_CATALOG_PATH or the bundled demo data.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Print the full breakdown as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = load_catalog(&config.catalog, args.catalog.as_deref())?;
    let engine = MatchingEngine::new(config.matching);

    let job_id = JobId::new(args.job);
    let candidate_id = CandidateId::new(args.candidate);
    let Some(posting) = catalog.job_posting(&job_id)? else {
        println!("Posting {job_id} not found in catalog");
        return Ok(());
    };
    let profile = catalog.candidate_profile(&candidate_id)?.unwrap_or_else(|| {
        println!("No profile for {candidate_id}; scoring as low confidence");
        CandidateProfile::empty(candidate_id.clone())
    });

    let breakdown = engine.compute(&profile, &posting);
    if args.json {
        match serde_json::to_string_pretty(&breakdown) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("Breakdown unavailable: {err}"),
        }
        return Ok(());
    }

    println!("{candidate_id} vs {} ({})", posting.id, posting.title);
    println!("- Match: {}", breakdown.summary());
    println!("- Matched skills: {}", list_or_none(&breakdown.matched_skills));
    println!("- Missing skills: {}", list_or_none(&breakdown.missing_skills));
    Ok(())
}

/// Prints each delivered notification so the demo shows the event stream.
struct ConsoleNotificationSink;

impl NotificationSink for ConsoleNotificationSink {
    fn deliver(&self, event: &StatusChanged) -> Result<(), EmitError> {
        let from = event
            .old_status
            .map(|status| status.label())
            .unwrap_or("(new)");
        println!(
            "    - [{}] {} {} -> {} by {}",
            event.event_id, event.candidate_id, from, event.new_status, event.actor_id
        );
        Ok(())
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let catalog = load_catalog(&config.catalog, args.catalog.as_deref())?;
    let job_id = JobId::new(args.job);

    let Some(posting) = catalog.job_posting(&job_id)? else {
        println!("Posting {job_id} not found in catalog");
        return Ok(());
    };
    let employer = Identity::employer(&posting.employer_id);
    let (registry, events) = build_registry(catalog, config.matching);

    println!("Hireflow demo: {} ({})", posting.title, posting.id);
    println!(
        "Weights: skills {} / experience {} / education {}",
        config.matching.skills(),
        config.matching.experience(),
        config.matching.education()
    );

    println!("\nIntake");
    let mut submitted = Vec::new();
    for candidate in ["cand-ada", "cand-lin", "cand-sam"] {
        let candidate_id = CandidateId::new(candidate);
        match registry.submit(
            &Identity::candidate(&candidate_id),
            candidate_id.clone(),
            job_id.clone(),
            ApplicationPayload::default(),
        ) {
            Ok(application) => {
                let score = application
                    .score_breakdown
                    .as_ref()
                    .map(|breakdown| breakdown.summary())
                    .unwrap_or_else(|| "unscored".to_string());
                println!("- {} applied as {}: {}", candidate, application.id, score);
                submitted.push(application);
            }
            Err(err) => println!("- {candidate} rejected: {err}"),
        }
    }

    let duplicate = registry.submit(
        &Identity::candidate(&CandidateId::new("cand-ada")),
        CandidateId::new("cand-ada"),
        job_id.clone(),
        ApplicationPayload::default(),
    );
    if let Err(err) = duplicate {
        println!("- Second cand-ada submission refused: {err}");
    }
    let closed_posting = registry.submit(
        &Identity::candidate(&CandidateId::new("cand-lin")),
        CandidateId::new("cand-lin"),
        JobId::new("job-intern-2023"),
        ApplicationPayload::default(),
    );
    if let Err(err) = closed_posting {
        println!("- cand-lin refused on the intern posting: {err}");
    }

    println!("\nRanked applicants");
    let ranked = registry.list_for_job(&employer, &job_id)?;
    for (position, application) in ranked.iter().enumerate() {
        let score = application
            .score
            .map(|score| score.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {}. {} score {} ({})",
            position + 1,
            application.candidate_id,
            score,
            application.status
        );
    }

    let Some(top) = ranked.first().cloned() else {
        println!("No applications to review");
        return Ok(());
    };

    println!("\nReview");
    let mut current = top;
    for target in [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interview,
        ApplicationStatus::Offered,
    ] {
        current = registry.transition(&employer, &current.id, target, current.version)?;
        println!("- {} -> {} (v{})", current.id, current.status, current.version);
    }

    let candidate = Identity::new(current.candidate_id.as_str(), ActorRole::Candidate);
    match registry.transition(
        &candidate,
        &current.id,
        ApplicationStatus::Withdrawn,
        current.version,
    ) {
        Err(ApplicationServiceError::InvalidTransition { from, to }) => {
            println!("- Withdrawal after offer refused ({from} -> {to})")
        }
        Err(err) => println!("- Withdrawal refused: {err}"),
        Ok(_) => println!("- Withdrawal unexpectedly accepted"),
    }

    let stale = current.version;
    current = registry.transition(
        &candidate,
        &current.id,
        ApplicationStatus::Accepted,
        current.version,
    )?;
    println!("- {} accepted the offer (v{})", current.candidate_id, current.version);

    let rival = Identity::employer(&EmployerId::new(DEMO_EMPLOYER));
    match registry.transition(&rival, &current.id, ApplicationStatus::Rejected, stale) {
        Err(ApplicationServiceError::VersionConflict { expected, actual }) => {
            println!("- Late rejection with v{expected} lost the race (now v{actual})")
        }
        Err(err) => println!("- Late rejection refused: {err}"),
        Ok(_) => println!("- Late rejection unexpectedly applied"),
    }

    for application in submitted.iter().filter(|app| app.id != current.id) {
        if let Ok(reviewed) = registry.transition(
            &employer,
            &application.id,
            ApplicationStatus::UnderReview,
            application.version,
        ) {
            let closed = registry.transition(
                &employer,
                &reviewed.id,
                ApplicationStatus::Rejected,
                reviewed.version,
            )?;
            println!("- {} -> {}", closed.candidate_id, closed.status);
        }
    }

    let checkpoints = InMemoryCheckpointStore::default();
    let report = registry.rescore_job(&employer, &job_id, "demo-rescore", &checkpoints)?;
    println!(
        "\nRescore pass: {} rescored, {} skipped, {} conflicted",
        report.rescored.len(),
        report.skipped.len(),
        report.conflicted.len()
    );

    println!("\nNotifications");
    drop(registry);
    let stats = NotificationDispatcher::new(Arc::new(ConsoleNotificationSink))
        .run(events)
        .await;
    println!(
        "  {} delivered, {} duplicates dropped, {} retried, {} failed",
        stats.delivered, stats.duplicates, stats.retried, stats.failed
    );

    Ok(())
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}
