use super::common::*;
use std::sync::{Arc, Barrier};
use std::thread;

use crate::workflows::recruitment::applications::domain::{
    ActorRole, ApplicationStatus, Identity,
};
use crate::workflows::recruitment::applications::lifecycle::{edges, TransitionEdge};
use crate::workflows::recruitment::applications::repository::ApplicationRepository;
use crate::workflows::recruitment::applications::ApplicationServiceError;

#[test]
fn every_graph_edge_advances_one_version() {
    for edge in edges() {
        let (registry, _, _, _) = build_registry();
        let submitted = submit_as(&registry, &candidate_id());
        let current = advance_to(&registry, submitted, edge.from);

        let moved = registry
            .transition(&admin(), &current.id, edge.to, current.version)
            .unwrap_or_else(|err| panic!("{} -> {} rejected: {err}", edge.from, edge.to));

        assert_eq!(moved.status, edge.to);
        assert_eq!(moved.version, current.version + 1);
        assert_eq!(moved.status_history.len(), current.status_history.len() + 1);
        let last = moved.status_history.last().expect("history entry");
        assert_eq!(last.status, edge.to);
        assert_eq!(last.actor_role, ActorRole::Admin);
        assert!(last.is_override, "admin moves are recorded as overrides");
    }
}

#[test]
fn pairs_outside_the_graph_leave_the_record_untouched() {
    for from in ApplicationStatus::ALL {
        for to in ApplicationStatus::ALL {
            if TransitionEdge::new(from, to).is_permitted() {
                continue;
            }

            let (registry, repository, _, events) = build_registry();
            let submitted = submit_as(&registry, &candidate_id());
            let current = advance_to(&registry, submitted, from);
            let emitted = events.events().len();

            match registry.transition(&admin(), &current.id, to, current.version) {
                Err(ApplicationServiceError::InvalidTransition { from: f, to: t }) => {
                    assert_eq!((f, t), (from, to));
                }
                other => panic!("{from} -> {to} should be invalid, got {other:?}"),
            }

            let stored = repository
                .fetch(&current.id)
                .expect("fetch succeeds")
                .expect("record present");
            assert_eq!(stored, current, "{from} -> {to} mutated the record");
            assert_eq!(events.events().len(), emitted, "{from} -> {to} emitted an event");
        }
    }
}

#[test]
fn candidate_cannot_withdraw_after_offer() {
    let (registry, _, _, _) = build_registry();
    let submitted = submit_as(&registry, &candidate_id());
    let offered = advance_to(&registry, submitted, ApplicationStatus::Offered);

    let outcome = registry.transition(
        &candidate(),
        &offered.id,
        ApplicationStatus::Withdrawn,
        offered.version,
    );
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::InvalidTransition {
            from: ApplicationStatus::Offered,
            to: ApplicationStatus::Withdrawn,
        })
    ));

    let accepted = registry
        .transition(
            &candidate(),
            &offered.id,
            ApplicationStatus::Accepted,
            offered.version,
        )
        .expect("candidate accepts the offer");
    assert_eq!(accepted.status, ApplicationStatus::Accepted);
    assert!(!accepted.status_history.last().expect("entry").is_override);
}

#[test]
fn employer_drives_review_stages() {
    let (registry, _, _, _) = build_registry();
    let mut current = submit_as(&registry, &candidate_id());

    for target in [
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interview,
        ApplicationStatus::Offered,
    ] {
        current = registry
            .transition(&employer(), &current.id, target, current.version)
            .expect("owning employer advances");
    }

    assert_eq!(current.version, 5);
    let trail: Vec<_> = current
        .status_history
        .iter()
        .map(|entry| entry.status)
        .collect();
    assert_eq!(
        trail,
        vec![
            ApplicationStatus::Submitted,
            ApplicationStatus::UnderReview,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::Interview,
            ApplicationStatus::Offered,
        ]
    );
}

#[test]
fn concurrent_transitions_with_same_version_yield_one_winner() {
    let (registry, repository, _, _) = build_registry();
    let submitted = submit_as(&registry, &candidate_id());
    let barrier = Arc::new(Barrier::new(2));

    let outcomes: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = [ApplicationStatus::UnderReview, ApplicationStatus::Withdrawn]
            .into_iter()
            .map(|target| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                let id = submitted.id.clone();
                scope.spawn(move || {
                    barrier.wait();
                    registry.transition(&admin(), &id, target, 1)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .collect()
    });

    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let conflicts = outcomes
        .iter()
        .filter(|outcome| {
            matches!(
                outcome,
                Err(ApplicationServiceError::VersionConflict {
                    expected: 1,
                    actual: 2
                })
            )
        })
        .count();
    assert_eq!((winners, conflicts), (1, 1));

    let stored = repository
        .fetch(&submitted.id)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.version, 2);
}

#[test]
fn stale_version_is_reported_before_permission() {
    let (registry, _, _, _) = build_registry();
    let submitted = submit_as(&registry, &candidate_id());
    let stranger = Identity::new("emp-9", ActorRole::Employer);

    let outcome = registry.transition(&stranger, &submitted.id, ApplicationStatus::UnderReview, 7);
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::VersionConflict {
            expected: 7,
            actual: 1
        })
    ));

    let outcome = registry.transition(&stranger, &submitted.id, ApplicationStatus::UnderReview, 1);
    assert!(matches!(
        outcome,
        Err(ApplicationServiceError::PermissionDenied(_))
    ));
}
