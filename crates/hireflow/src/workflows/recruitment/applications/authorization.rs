use super::domain::{ActorRole, ApplicationStatus, CandidateId, EmployerId, Identity};
use super::lifecycle::TransitionEdge;

/// Reasons the guard refuses an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("{role} accounts cannot submit applications")]
    SubmitNotPermitted { role: ActorRole },
    #[error("candidates may only submit applications for themselves")]
    SubmitOnBehalf,
    #[error("{role} cannot move applications to {target}")]
    TargetNotPermitted {
        role: ActorRole,
        target: ApplicationStatus,
    },
    #[error("{role} does not own this application")]
    NotOwner { role: ActorRole },
    #[error("{role} cannot {action}")]
    ActionNotPermitted {
        role: ActorRole,
        action: &'static str,
    },
}

/// Ownership facts about the application being acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ownership {
    pub candidate_id: CandidateId,
    /// Owner of the underlying posting; `None` when the catalog no longer knows the job.
    pub employer_id: Option<EmployerId>,
}

impl Ownership {
    fn owned_by(&self, identity: &Identity) -> bool {
        match identity.role {
            ActorRole::Candidate => identity.actor_id.0 == self.candidate_id.0,
            ActorRole::Employer => self
                .employer_id
                .as_ref()
                .is_some_and(|employer| identity.actor_id.0 == employer.0),
            ActorRole::Admin => true,
        }
    }
}

/// Outcome of a permitted transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionGrant {
    pub is_override: bool,
}

const CANDIDATE_TARGETS: &[ApplicationStatus] = &[
    ApplicationStatus::Withdrawn,
    ApplicationStatus::Accepted,
    ApplicationStatus::Declined,
];

const EMPLOYER_TARGETS: &[ApplicationStatus] = &[
    ApplicationStatus::UnderReview,
    ApplicationStatus::Shortlisted,
    ApplicationStatus::Interview,
    ApplicationStatus::Offered,
    ApplicationStatus::Rejected,
];

/// Single capability table consulted at every mutating entry point.
///
/// The guard decides on role, ownership and requested target only. Whether the source
/// status admits the edge is left to the lifecycle graph so illegal edges are reported the
/// same way for every actor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationGuard;

impl AuthorizationGuard {
    pub fn authorize_submit(
        &self,
        identity: &Identity,
        candidate_id: &CandidateId,
    ) -> Result<(), AccessDenied> {
        match identity.role {
            ActorRole::Candidate if identity.actor_id.0 == candidate_id.0 => Ok(()),
            ActorRole::Candidate => Err(AccessDenied::SubmitOnBehalf),
            role => Err(AccessDenied::SubmitNotPermitted { role }),
        }
    }

    pub fn authorize_transition(
        &self,
        identity: &Identity,
        ownership: &Ownership,
        edge: TransitionEdge,
    ) -> Result<TransitionGrant, AccessDenied> {
        let role = identity.role;
        let permitted_targets = match role {
            ActorRole::Admin => return Ok(TransitionGrant { is_override: true }),
            ActorRole::Candidate => CANDIDATE_TARGETS,
            ActorRole::Employer => EMPLOYER_TARGETS,
        };

        if !permitted_targets.contains(&edge.to) {
            return Err(AccessDenied::TargetNotPermitted {
                role,
                target: edge.to,
            });
        }

        if !ownership.owned_by(identity) {
            return Err(AccessDenied::NotOwner { role });
        }

        Ok(TransitionGrant { is_override: false })
    }

    /// Candidate owner, owning employer, or admin may read an application.
    pub fn authorize_read(
        &self,
        identity: &Identity,
        ownership: &Ownership,
    ) -> Result<(), AccessDenied> {
        if ownership.owned_by(identity) {
            Ok(())
        } else {
            Err(AccessDenied::NotOwner {
                role: identity.role,
            })
        }
    }

    /// Score refreshes are an employer/admin maintenance action.
    pub fn authorize_rescore(
        &self,
        identity: &Identity,
        ownership: &Ownership,
    ) -> Result<(), AccessDenied> {
        if identity.role == ActorRole::Candidate {
            return Err(AccessDenied::ActionNotPermitted {
                role: identity.role,
                action: "refresh match scores",
            });
        }
        self.authorize_read(identity, ownership)
    }

    pub fn authorize_job_listing(
        &self,
        identity: &Identity,
        employer_id: &EmployerId,
    ) -> Result<(), AccessDenied> {
        match identity.role {
            ActorRole::Admin => Ok(()),
            ActorRole::Employer if identity.actor_id.0 == employer_id.0 => Ok(()),
            ActorRole::Employer => Err(AccessDenied::NotOwner {
                role: ActorRole::Employer,
            }),
            ActorRole::Candidate => Err(AccessDenied::ActionNotPermitted {
                role: ActorRole::Candidate,
                action: "list applications for a job",
            }),
        }
    }

    pub fn authorize_candidate_listing(
        &self,
        identity: &Identity,
        candidate_id: &CandidateId,
    ) -> Result<(), AccessDenied> {
        match identity.role {
            ActorRole::Admin => Ok(()),
            ActorRole::Candidate if identity.actor_id.0 == candidate_id.0 => Ok(()),
            role => Err(AccessDenied::NotOwner { role }),
        }
    }
}
