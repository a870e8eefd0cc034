//! Directed graph of legal application status changes.
//!
//! Withdrawal is open at every pre-offer stage. Once an offer exists the candidate may only
//! accept or decline it, and terminal statuses have no outgoing edges at all.

use serde::{Deserialize, Serialize};

use super::domain::ApplicationStatus;
use ApplicationStatus::*;

/// A requested `(from, to)` status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: ApplicationStatus,
    pub to: ApplicationStatus,
}

impl TransitionEdge {
    pub const fn new(from: ApplicationStatus, to: ApplicationStatus) -> Self {
        Self { from, to }
    }

    pub fn is_permitted(self) -> bool {
        successors(self.from).contains(&self.to)
    }
}

/// Statuses reachable in one step from `status`.
pub const fn successors(status: ApplicationStatus) -> &'static [ApplicationStatus] {
    match status {
        Submitted => &[UnderReview, Withdrawn],
        UnderReview => &[Shortlisted, Rejected, Withdrawn],
        Shortlisted => &[Interview, Rejected, Withdrawn],
        Interview => &[Offered, Rejected, Withdrawn],
        Offered => &[Accepted, Declined],
        Rejected | Withdrawn | Accepted | Declined => &[],
    }
}

/// Every edge of the graph, in declaration order.
pub fn edges() -> impl Iterator<Item = TransitionEdge> {
    ApplicationStatus::ALL.into_iter().flat_map(|from| {
        successors(from)
            .iter()
            .map(move |to| TransitionEdge::new(from, *to))
    })
}
