mod config;
mod rules;

pub use config::{MatchingWeights, WeightsError};

use super::domain::{CandidateProfile, JobPosting};
use serde::{Deserialize, Serialize};

/// Stateless scorer ranking a candidate profile against a posting's requirements.
///
/// Identical inputs always produce identical breakdowns. Missing profile fields score 0 and
/// mark the result low confidence instead of failing, so intake never blocks on them.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: MatchingWeights,
}

impl MatchingEngine {
    pub fn new(weights: MatchingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &MatchingWeights {
        &self.weights
    }

    pub fn compute(&self, profile: &CandidateProfile, posting: &JobPosting) -> ScoreBreakdown {
        let mut missing_fields = Vec::new();

        let skills = profile.skills.as_ref().filter(|skills| !skills.is_empty());
        if skills.is_none() {
            missing_fields.push(ProfileField::Skills);
        }
        let overlap = rules::skills_overlap(skills, &posting.required_skills);

        let experience_score = match profile.years_experience {
            Some(years) if years.is_finite() && years >= 0.0 => {
                rules::experience_score(years, &posting.experience_range)
            }
            _ => {
                missing_fields.push(ProfileField::YearsExperience);
                0
            }
        };

        let education_score = match profile.education_level {
            Some(level) => rules::education_score(level, posting.education_level),
            None => {
                missing_fields.push(ProfileField::EducationLevel);
                0
            }
        };

        let composite_score = rules::composite_score(
            &self.weights,
            overlap.score,
            experience_score,
            education_score,
        );

        let confidence = if missing_fields.is_empty() {
            Confidence::High
        } else {
            Confidence::Low
        };

        ScoreBreakdown {
            skills_score: overlap.score,
            experience_score,
            education_score,
            composite_score,
            confidence,
            matched_skills: overlap.matched,
            missing_skills: overlap.missing,
            missing_fields,
            weights: self.weights,
        }
    }
}

/// Whether every scoring input was present on the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Low,
}

/// Profile inputs the engine could not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Skills,
    YearsExperience,
    EducationLevel,
}

impl ProfileField {
    pub const fn label(self) -> &'static str {
        match self {
            ProfileField::Skills => "skills",
            ProfileField::YearsExperience => "years of experience",
            ProfileField::EducationLevel => "education level",
        }
    }
}

/// Explainable score attached to an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skills_score: u8,
    pub experience_score: u8,
    pub education_score: u8,
    pub composite_score: u8,
    pub confidence: Confidence,
    #[serde(default)]
    pub matched_skills: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub missing_fields: Vec<ProfileField>,
    pub weights: MatchingWeights,
}

impl ScoreBreakdown {
    pub fn is_approximate(&self) -> bool {
        self.confidence == Confidence::Low
    }

    pub fn summary(&self) -> String {
        let base = format!(
            "{}/100 (skills {}, experience {}, education {})",
            self.composite_score, self.skills_score, self.experience_score, self.education_score
        );

        if self.missing_fields.is_empty() {
            return base;
        }

        let missing: Vec<&str> = self.missing_fields.iter().map(|f| f.label()).collect();
        format!("{base}, approximate: missing {}", missing.join(", "))
    }
}
