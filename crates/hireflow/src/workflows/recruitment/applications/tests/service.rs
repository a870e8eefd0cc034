use super::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, Utc};

use crate::workflows::recruitment::applications::authorization::AccessDenied;
use crate::workflows::recruitment::applications::domain::{
    ActorRole, Application, ApplicationId, ApplicationPayload, ApplicationStatus, CandidateId,
    Identity, JobId, JobStatus,
};
use crate::workflows::recruitment::applications::matching::{Confidence, ProfileField};
use crate::workflows::recruitment::applications::memory::{
    InMemoryApplicationRepository, InMemoryCatalog, InMemoryCheckpointStore,
};
use crate::workflows::recruitment::applications::repository::{rank, ApplicationRepository};
use crate::workflows::recruitment::applications::service::Missing;
use crate::workflows::recruitment::applications::{
    ApplicationRegistry, ApplicationServiceError, MatchingWeights,
};

#[test]
fn submit_scores_and_records_initial_history() {
    let (registry, repository, _, events) = build_registry();

    let application = registry
        .submit(
            &candidate(),
            candidate_id(),
            job_id(),
            ApplicationPayload {
                cover_letter: Some("Keen to help".to_string()),
                ..ApplicationPayload::default()
            },
        )
        .expect("submission succeeds");

    assert_eq!(application.status, ApplicationStatus::Submitted);
    assert_eq!(application.version, 1);
    assert_eq!(application.score, Some(84));
    assert_eq!(application.status_history.len(), 1);
    assert_eq!(application.status_history[0].actor_role, ActorRole::Candidate);
    assert_eq!(repository.len(), Ok(1));

    let emitted = events.events();
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].old_status, None);
    assert_eq!(emitted[0].new_status, ApplicationStatus::Submitted);
    assert_eq!(emitted[0].event_id, format!("{}:v1", application.id));
}

#[test]
fn duplicate_submission_is_refused_until_terminal() {
    let (registry, _, _, _) = build_registry();
    let first = submit_as(&registry, &candidate_id());

    match registry.submit(
        &candidate(),
        candidate_id(),
        job_id(),
        ApplicationPayload::default(),
    ) {
        Err(ApplicationServiceError::DuplicateApplication { existing, .. }) => {
            assert_eq!(existing, first.id)
        }
        other => panic!("expected duplicate error, got {other:?}"),
    }

    registry
        .transition(&candidate(), &first.id, ApplicationStatus::Withdrawn, 1)
        .expect("candidate withdraws");

    let second = submit_as(&registry, &candidate_id());
    assert_ne!(second.id, first.id);
    assert_eq!(second.version, 1);
}

#[test]
fn concurrent_submissions_for_one_pair_admit_a_single_application() {
    let (registry, repository, _, events) = build_registry();
    let barrier = Arc::new(Barrier::new(2));

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                scope.spawn(move || {
                    barrier.wait();
                    registry.submit(
                        &candidate(),
                        candidate_id(),
                        job_id(),
                        ApplicationPayload::default(),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    let accepted: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| outcome.as_ref().ok())
        .collect();
    assert_eq!(accepted.len(), 1);
    let refused = outcomes
        .iter()
        .filter(|outcome| {
            matches!(
                outcome,
                Err(ApplicationServiceError::DuplicateApplication { existing, .. })
                    if existing == &accepted[0].id
            )
        })
        .count();
    assert_eq!(refused, 1);
    assert_eq!(repository.len(), Ok(1));
    assert_eq!(events.events().len(), 1, "only the stored application is announced");
}

#[test]
fn registries_sharing_a_repository_never_reuse_application_ids() {
    let (first_registry, repository, catalog, _) = build_registry();
    catalog
        .upsert_candidate(full_match_profile("cand-3"))
        .expect("catalog writable");
    let second_registry = ApplicationRegistry::new(
        repository.clone(),
        catalog.clone(),
        Arc::new(RecordingEmitter::default()),
        MatchingWeights::default(),
    );

    let first = submit_as(&first_registry, &candidate_id());
    let second = second_registry
        .submit(
            &Identity::candidate(&CandidateId::new("cand-3")),
            CandidateId::new("cand-3"),
            job_id(),
            ApplicationPayload::default(),
        )
        .expect("a new pair is accepted through the second registry");

    assert_ne!(first.id, second.id);
    assert_eq!(repository.len(), Ok(2));
    assert_eq!(
        repository
            .fetch(&first.id)
            .expect("fetch succeeds")
            .map(|stored| stored.candidate_id),
        Some(candidate_id())
    );
}

#[test]
fn only_candidates_submit_for_themselves() {
    let (registry, repository, _, _) = build_registry();

    let outcome = registry.submit(
        &employer(),
        candidate_id(),
        job_id(),
        ApplicationPayload::default(),
    );
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::PermissionDenied(
            AccessDenied::SubmitNotPermitted { .. }
        ))
    ));

    let outcome = registry.submit(
        &Identity::new("cand-2", ActorRole::Candidate),
        candidate_id(),
        job_id(),
        ApplicationPayload::default(),
    );
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::PermissionDenied(
            AccessDenied::SubmitOnBehalf
        ))
    ));
    assert_eq!(repository.is_empty(), Ok(true));
}

#[test]
fn submit_requires_an_open_posting() {
    let (registry, _, catalog, _) = build_registry();

    let outcome = registry.submit(
        &candidate(),
        candidate_id(),
        JobId::new("job-404"),
        ApplicationPayload::default(),
    );
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::NotFound(Missing::Job(_)))
    ));

    let mut closed = posting();
    closed.status = JobStatus::Closed;
    catalog.upsert_job(closed).expect("catalog writable");
    let outcome = registry.submit(
        &candidate(),
        candidate_id(),
        job_id(),
        ApplicationPayload::default(),
    );
    assert!(matches!(outcome, Err(ApplicationServiceError::JobClosed(_))));
}

#[test]
fn missing_profile_yields_low_confidence_score() {
    let (registry, _, _, _) = build_registry();
    let application = submit_as(&registry, &CandidateId::new("cand-ghost"));

    let breakdown = application.score_breakdown.expect("score attached");
    assert_eq!(application.score, Some(0));
    assert_eq!(breakdown.confidence, Confidence::Low);
    assert_eq!(
        breakdown.missing_fields,
        vec![
            ProfileField::Skills,
            ProfileField::YearsExperience,
            ProfileField::EducationLevel
        ]
    );
}

#[test]
fn unreachable_profiles_leave_submission_unscored() {
    let registry = ApplicationRegistry::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(ProfileOutageCatalog {
            inner: seeded_catalog(),
        }),
        Arc::new(RecordingEmitter::default()),
        MatchingWeights::default(),
    );

    let application = registry
        .submit(
            &candidate(),
            candidate_id(),
            job_id(),
            ApplicationPayload::default(),
        )
        .expect("intake never blocks on scoring");
    assert_eq!(application.score, None);
    assert!(application.score_breakdown.is_none());

    let outcome = registry.refresh_score(&employer(), &application.id, application.version);
    assert!(matches!(outcome, Err(ApplicationServiceError::Catalog(_))));
}

#[test]
fn closed_event_channel_does_not_fail_mutations() {
    let registry = ApplicationRegistry::new(
        Arc::new(InMemoryApplicationRepository::default()),
        Arc::new(seeded_catalog()),
        Arc::new(ClosedEmitter),
        MatchingWeights::default(),
    );

    let application = registry
        .submit(
            &candidate(),
            candidate_id(),
            job_id(),
            ApplicationPayload::default(),
        )
        .expect("submission succeeds");
    let moved = registry
        .transition(
            &employer(),
            &application.id,
            ApplicationStatus::UnderReview,
            1,
        )
        .expect("transition succeeds");
    assert_eq!(moved.version, 2);
}

#[test]
fn transitions_emit_versioned_events() {
    let (registry, _, _, events) = build_registry();
    let application = submit_as(&registry, &candidate_id());

    registry
        .transition(
            &employer(),
            &application.id,
            ApplicationStatus::UnderReview,
            1,
        )
        .expect("transition succeeds");
    let _ = registry.transition(
        &employer(),
        &application.id,
        ApplicationStatus::Offered,
        2,
    );

    let emitted = events.events();
    assert_eq!(emitted.len(), 2, "refused transitions emit nothing");
    let last = &emitted[1];
    assert_eq!(last.old_status, Some(ApplicationStatus::Submitted));
    assert_eq!(last.new_status, ApplicationStatus::UnderReview);
    assert_eq!(last.version, 2);
    assert_eq!(last.actor_id.as_str(), "emp-1");
    assert_eq!(last.event_id, format!("{}:v2", application.id));
}

#[test]
fn unknown_application_is_not_found() {
    let (registry, _, _, _) = build_registry();
    let outcome = registry.transition(
        &admin(),
        &ApplicationId::new("app-missing"),
        ApplicationStatus::UnderReview,
        1,
    );
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::NotFound(Missing::Application(_)))
    ));
}

#[test]
fn reads_are_limited_to_owners() {
    let (registry, _, _, _) = build_registry();
    let application = submit_as(&registry, &candidate_id());

    assert!(registry.get(&candidate(), &application.id).is_ok());
    assert!(registry.get(&employer(), &application.id).is_ok());
    assert!(registry.get(&admin(), &application.id).is_ok());

    let stranger = Identity::new("cand-2", ActorRole::Candidate);
    assert!(matches!(
        registry.get(&stranger, &application.id),
        Err(ApplicationServiceError::PermissionDenied(_))
    ));
    assert!(registry.list_for_candidate(&stranger, &candidate_id()).is_err());
    assert!(registry.list_for_job(&candidate(), &job_id()).is_err());
    assert!(registry
        .list_for_job(&Identity::new("emp-2", ActorRole::Employer), &job_id())
        .is_err());
}

#[test]
fn job_listing_ranks_best_matches_first() {
    let (registry, _, catalog, _) = build_registry();
    catalog.upsert_candidate(full_match_profile("cand-3")).expect("catalog writable");

    let partial = submit_as(&registry, &candidate_id());
    let ghost = submit_as(&registry, &CandidateId::new("cand-2"));
    let best = submit_as(&registry, &CandidateId::new("cand-3"));

    let ranked: Vec<_> = registry
        .list_for_job(&employer(), &job_id())
        .expect("owner lists")
        .into_iter()
        .map(|application| application.id)
        .collect();
    assert_eq!(ranked, vec![best.id, partial.id, ghost.id]);
}

#[test]
fn rank_places_unscored_applications_last() {
    let now = Utc::now();
    let scored = |id: &str, score: Option<u8>, offset: i64| {
        let mut application = Application::submitted(
            ApplicationId::new(id),
            job_id(),
            CandidateId::new(id),
            ApplicationPayload::default(),
            &admin(),
            None,
            now + Duration::seconds(offset),
        );
        application.score = score;
        application
    };

    let ordered: Vec<_> = rank(vec![
        scored("late-none", None, 1),
        scored("early-70", Some(70), 0),
        scored("late-70", Some(70), 5),
        scored("high", Some(90), 9),
    ])
    .into_iter()
    .map(|application| application.id.0)
    .collect();

    assert_eq!(ordered, vec!["high", "early-70", "late-70", "late-none"]);
}

#[test]
fn candidate_listing_is_newest_first() {
    let (registry, _, catalog, _) = build_registry();
    let mut second_job = posting();
    second_job.id = JobId::new("job-2");
    catalog.upsert_job(second_job).expect("catalog writable");

    let first = submit_as(&registry, &candidate_id());
    let second = registry
        .submit(
            &candidate(),
            candidate_id(),
            JobId::new("job-2"),
            ApplicationPayload::default(),
        )
        .expect("second job accepts");

    let listed = registry
        .list_for_candidate(&candidate(), &candidate_id())
        .expect("own listing");
    assert_eq!(listed.len(), 2);
    assert!(listed[0].created_at >= listed[1].created_at);
    assert!(listed.iter().any(|application| application.id == first.id));
    assert!(listed.iter().any(|application| application.id == second.id));
}

#[test]
fn preview_scores_without_creating_applications() {
    let (registry, repository, _, events) = build_registry();

    let breakdown = registry
        .preview_match(&employer(), &job_id(), &candidate_id())
        .expect("owner previews");
    assert_eq!(breakdown.composite_score, 84);
    assert!(registry
        .preview_match(&candidate(), &job_id(), &candidate_id())
        .is_ok());
    assert!(registry
        .preview_match(
            &Identity::new("cand-2", ActorRole::Candidate),
            &job_id(),
            &candidate_id()
        )
        .is_err());

    assert_eq!(repository.is_empty(), Ok(true));
    assert!(events.events().is_empty());
}

#[test]
fn refresh_picks_up_changed_requirements() {
    let (registry, _, catalog, events) = build_registry();
    let application = submit_as(&registry, &candidate_id());

    let mut relaxed = posting();
    relaxed.required_skills = skills(&["React", "Node"]);
    catalog.upsert_job(relaxed).expect("catalog writable");

    let refreshed = registry
        .refresh_score(&employer(), &application.id, application.version)
        .expect("owner refreshes");
    assert_eq!(refreshed.score, Some(100));
    assert_eq!(refreshed.version, application.version + 1);
    assert_eq!(refreshed.status_history, application.status_history);
    assert_eq!(events.events().len(), 1, "rescoring is not a status change");

    let outcome = registry.refresh_score(&employer(), &application.id, application.version);
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::VersionConflict { .. })
    ));
    assert!(matches!(
        registry.refresh_score(&candidate(), &application.id, refreshed.version),
        Err(ApplicationServiceError::PermissionDenied(_))
    ));
}

#[test]
fn terminal_scores_are_frozen() {
    let (registry, _, _, _) = build_registry();
    let application = submit_as(&registry, &candidate_id());
    let rejected = advance_to(&registry, application, ApplicationStatus::Rejected);

    assert!(matches!(
        registry.refresh_score(&admin(), &rejected.id, rejected.version),
        Err(ApplicationServiceError::ScoreFrozen {
            status: ApplicationStatus::Rejected,
            ..
        })
    ));
}

#[test]
fn rescore_run_checkpoints_each_application() {
    let (registry, repository, catalog, _) = build_registry();
    let checkpoints = InMemoryCheckpointStore::default();
    catalog.upsert_candidate(full_match_profile("cand-3")).expect("catalog writable");

    let kept = submit_as(&registry, &candidate_id());
    let other = submit_as(&registry, &CandidateId::new("cand-3"));
    let withdrawn = submit_as(&registry, &CandidateId::new("cand-2"));
    registry
        .transition(
            &Identity::new("cand-2", ActorRole::Candidate),
            &withdrawn.id,
            ApplicationStatus::Withdrawn,
            1,
        )
        .expect("withdrawal");

    let report = registry
        .rescore_job(&employer(), &job_id(), "nightly-1", &checkpoints)
        .expect("first pass");
    assert_eq!(report.rescored.len(), 2);
    assert!(report.rescored.contains(&kept.id));
    assert!(report.rescored.contains(&other.id));
    assert!(report.skipped.is_empty());
    assert!(report.is_complete());

    let resumed = registry
        .rescore_job(&employer(), &job_id(), "nightly-1", &checkpoints)
        .expect("resumed pass");
    assert!(resumed.rescored.is_empty());
    assert_eq!(resumed.skipped.len(), 2);

    let stored = repository
        .fetch(&kept.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.version, 2, "resumed run does not rescore twice");

    let fresh = registry
        .rescore_job(&admin(), &job_id(), "nightly-2", &checkpoints)
        .expect("new run");
    assert_eq!(fresh.rescored.len(), 2);

    assert!(matches!(
        registry.rescore_job(&candidate(), &job_id(), "nightly-3", &checkpoints),
        Err(ApplicationServiceError::PermissionDenied(_))
    ));
}

#[test]
fn rescore_leaves_conflicted_applications_for_retry() {
    let catalog = InMemoryCatalog::default();
    catalog.upsert_job(posting()).expect("catalog writable");
    catalog.upsert_candidate(profile()).expect("catalog writable");
    let inner = InMemoryApplicationRepository::default();
    let seeding = ApplicationRegistry::new(
        Arc::new(inner.clone()),
        Arc::new(catalog.clone()),
        Arc::new(RecordingEmitter::default()),
        MatchingWeights::default(),
    );
    let contested = seeding
        .submit(
            &candidate(),
            candidate_id(),
            job_id(),
            ApplicationPayload::default(),
        )
        .expect("seed submission");

    let registry = ApplicationRegistry::new(
        Arc::new(RacingRepository {
            inner,
            stale: contested.id.clone(),
        }),
        Arc::new(catalog),
        Arc::new(RecordingEmitter::default()),
        MatchingWeights::default(),
    );
    let checkpoints = InMemoryCheckpointStore::default();

    let report = registry
        .rescore_job(&employer(), &job_id(), "retry", &checkpoints)
        .expect("pass completes");
    assert_eq!(report.conflicted, vec![contested.id.clone()]);
    assert!(!report.is_complete());

    let again = registry
        .rescore_job(&employer(), &job_id(), "retry", &checkpoints)
        .expect("second pass");
    assert!(again.skipped.is_empty(), "conflicts are never checkpointed");
    assert_eq!(again.conflicted, vec![contested.id]);
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let registry = ApplicationRegistry::new(
        Arc::new(UnavailableRepository),
        Arc::new(seeded_catalog()),
        Arc::new(RecordingEmitter::default()),
        MatchingWeights::default(),
    );
    assert!(matches!(
        registry.get(&admin(), &ApplicationId::new("app-000001")),
        Err(ApplicationServiceError::Repository(_))
    ));
}
