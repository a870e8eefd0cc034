use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::matching::ScoreBreakdown;

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Identifier wrapper for submitted applications.
    ApplicationId
);
identifier!(
    /// Catalog identifier of a job or gig posting.
    JobId
);
identifier!(
    /// Catalog identifier of a candidate profile.
    CandidateId
);
identifier!(
    /// Employer account owning one or more postings.
    EmployerId
);
identifier!(
    /// Verified actor performing a request.
    ActorId
);

/// Role asserted by the upstream identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Candidate,
    Employer,
    Admin,
}

impl ActorRole {
    pub const fn label(self) -> &'static str {
        match self {
            ActorRole::Candidate => "candidate",
            ActorRole::Employer => "employer",
            ActorRole::Admin => "admin",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown actor role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for ActorRole {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(Self::Candidate),
            "employer" => Ok(Self::Employer),
            "admin" => Ok(Self::Admin),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Verified `(actor, role)` pair handed to every registry call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub actor_id: ActorId,
    pub role: ActorRole,
}

impl Identity {
    pub fn new(actor_id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            actor_id: ActorId(actor_id.into()),
            role,
        }
    }

    pub fn candidate(candidate: &CandidateId) -> Self {
        Self::new(candidate.0.clone(), ActorRole::Candidate)
    }

    pub fn employer(employer: &EmployerId) -> Self {
        Self::new(employer.0.clone(), ActorRole::Employer)
    }

    pub fn admin(actor_id: impl Into<String>) -> Self {
        Self::new(actor_id, ActorRole::Admin)
    }
}

/// Ordinal education ladder shared by postings and profiles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum EducationLevel {
    #[serde(rename = "none")]
    NoFormal,
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl EducationLevel {
    pub const fn ordinal(self) -> u8 {
        match self {
            EducationLevel::NoFormal => 0,
            EducationLevel::HighSchool => 1,
            EducationLevel::Associate => 2,
            EducationLevel::Bachelor => 3,
            EducationLevel::Master => 4,
            EducationLevel::Doctorate => 5,
        }
    }
}

/// Inclusive band of years a posting asks for.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperienceRange {
    pub min_years: f64,
    pub max_years: f64,
}

impl ExperienceRange {
    pub fn new(min_years: f64, max_years: f64) -> Self {
        Self {
            min_years,
            max_years,
        }
    }

    /// Bounds ordered low to high, tolerating postings entered backwards.
    pub fn bounds(&self) -> (f64, f64) {
        if self.min_years <= self.max_years {
            (self.min_years, self.max_years)
        } else {
            (self.max_years, self.min_years)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Draft,
    Open,
    Closed,
}

/// Read-only posting requirements supplied by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: JobId,
    pub employer_id: EmployerId,
    #[serde(default)]
    pub title: String,
    pub required_skills: BTreeSet<String>,
    pub experience_range: ExperienceRange,
    pub education_level: EducationLevel,
    pub status: JobStatus,
}

/// Read-only candidate profile; any field may be absent on incomplete profiles.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: CandidateId,
    #[serde(default)]
    pub skills: Option<BTreeSet<String>>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub education_level: Option<EducationLevel>,
}

impl CandidateProfile {
    /// Placeholder used when the catalog has no profile for the candidate.
    pub fn empty(id: CandidateId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Free-form material captured alongside a submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplicationPayload {
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub resume_ref: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
}

/// Lifecycle status of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    Interview,
    Offered,
    Accepted,
    Declined,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 9] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interview,
        ApplicationStatus::Offered,
        ApplicationStatus::Accepted,
        ApplicationStatus::Declined,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under-review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::Offered => "offered",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Declined => "declined",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted
                | ApplicationStatus::Declined
                | ApplicationStatus::Rejected
                | ApplicationStatus::Withdrawn
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One audited status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: ApplicationStatus,
    pub actor_id: ActorId,
    pub actor_role: ActorRole,
    #[serde(rename = "override", default)]
    pub is_override: bool,
    pub timestamp: DateTime<Utc>,
}

/// Persisted application record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub job_id: JobId,
    pub candidate_id: CandidateId,
    pub status: ApplicationStatus,
    pub score: Option<u8>,
    pub score_breakdown: Option<ScoreBreakdown>,
    pub version: u64,
    pub status_history: Vec<StatusHistoryEntry>,
    #[serde(default)]
    pub payload: ApplicationPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Application {
    pub(crate) fn submitted(
        id: ApplicationId,
        job_id: JobId,
        candidate_id: CandidateId,
        payload: ApplicationPayload,
        submitted_by: &Identity,
        breakdown: Option<ScoreBreakdown>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            job_id,
            candidate_id,
            status: ApplicationStatus::Submitted,
            score: breakdown.as_ref().map(|b| b.composite_score),
            score_breakdown: breakdown,
            version: 1,
            status_history: vec![StatusHistoryEntry {
                status: ApplicationStatus::Submitted,
                actor_id: submitted_by.actor_id.clone(),
                actor_role: submitted_by.role,
                is_override: false,
                timestamp: now,
            }],
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Copy of this record moved to `target`, one version ahead.
    pub(crate) fn advanced_to(
        &self,
        target: ApplicationStatus,
        actor: &Identity,
        is_override: bool,
        now: DateTime<Utc>,
    ) -> Self {
        let mut next = self.clone();
        next.status = target;
        next.status_history.push(StatusHistoryEntry {
            status: target,
            actor_id: actor.actor_id.clone(),
            actor_role: actor.role,
            is_override,
            timestamp: now,
        });
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }

    /// Copy of this record carrying a recomputed score, one version ahead.
    pub(crate) fn rescored(&self, breakdown: ScoreBreakdown, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.score = Some(breakdown.composite_score);
        next.score_breakdown = Some(breakdown);
        next.version = self.version + 1;
        next.updated_at = now;
        next
    }
}
