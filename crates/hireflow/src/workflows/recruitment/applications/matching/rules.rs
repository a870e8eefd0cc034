use std::collections::{BTreeMap, BTreeSet};

use super::super::domain::{EducationLevel, ExperienceRange};
use super::config::MatchingWeights;

/// Points lost per education rung below the requirement.
const EDUCATION_STEP_PENALTY: i16 = 25;

pub(crate) struct SkillOverlap {
    pub score: u8,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

/// Case and whitespace insensitive form used for comparisons.
pub(crate) fn normalize_skill(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub(crate) fn round_points(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

pub(crate) fn skills_overlap(
    candidate: Option<&BTreeSet<String>>,
    required: &BTreeSet<String>,
) -> SkillOverlap {
    // Keyed by normalized form, keeping the posting's spelling for the breakdown.
    let required: BTreeMap<String, &String> = required
        .iter()
        .map(|skill| (normalize_skill(skill), skill))
        .filter(|(key, _)| !key.is_empty())
        .collect();

    let held: BTreeSet<String> = candidate
        .map(|skills| skills.iter().map(|skill| normalize_skill(skill)).collect())
        .unwrap_or_default();

    let (matched, missing): (Vec<_>, Vec<_>) =
        required.iter().partition(|(key, _)| held.contains(*key));

    let denominator = required.len().max(1) as f64;
    let score = round_points(100.0 * matched.len() as f64 / denominator);

    SkillOverlap {
        score,
        matched: matched.into_iter().map(|(_, skill)| (*skill).clone()).collect(),
        missing: missing.into_iter().map(|(_, skill)| (*skill).clone()).collect(),
    }
}

pub(crate) fn experience_score(years: f64, range: &ExperienceRange) -> u8 {
    let (min, max) = range.bounds();
    if years >= min && years <= max {
        return 100;
    }

    let distance = if years < min { min - years } else { years - max };
    let width = max - min;
    let span = if width > 0.0 { width } else { 1.0 };

    round_points(100.0 * (1.0 - distance / span))
}

pub(crate) fn education_score(candidate: EducationLevel, required: EducationLevel) -> u8 {
    if candidate >= required {
        return 100;
    }

    let distance = i16::from(required.ordinal()) - i16::from(candidate.ordinal());
    (100 - EDUCATION_STEP_PENALTY * distance).clamp(0, 100) as u8
}

/// Weighted sum computed in hundredths of a point, rounded half up.
pub(crate) fn composite_score(
    weights: &MatchingWeights,
    skills: u8,
    experience: u8,
    education: u8,
) -> u8 {
    let hundredths = u32::from(weights.skills()) * u32::from(skills)
        + u32::from(weights.experience()) * u32::from(experience)
        + u32::from(weights.education()) * u32::from(education);
    ((hundredths + 50) / 100).min(100) as u8
}
