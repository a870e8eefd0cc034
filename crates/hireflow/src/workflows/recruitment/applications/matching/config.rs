use serde::{Deserialize, Serialize};

/// Integer percentage weights applied to the three sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights")]
pub struct MatchingWeights {
    skills: u8,
    experience: u8,
    education: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeightsError {
    #[error("weights must sum to 100, got {skills} + {experience} + {education} = {total}")]
    Unbalanced {
        skills: u8,
        experience: u8,
        education: u8,
        total: u16,
    },
}

impl MatchingWeights {
    pub fn new(skills: u8, experience: u8, education: u8) -> Result<Self, WeightsError> {
        let total = u16::from(skills) + u16::from(experience) + u16::from(education);
        if total != 100 {
            return Err(WeightsError::Unbalanced {
                skills,
                experience,
                education,
                total,
            });
        }

        Ok(Self {
            skills,
            experience,
            education,
        })
    }

    pub fn skills(&self) -> u8 {
        self.skills
    }

    pub fn experience(&self) -> u8 {
        self.experience
    }

    pub fn education(&self) -> u8 {
        self.education
    }
}

impl Default for MatchingWeights {
    fn default() -> Self {
        Self {
            skills: 50,
            experience: 30,
            education: 20,
        }
    }
}

#[derive(Deserialize)]
struct RawWeights {
    skills: u8,
    experience: u8,
    education: u8,
}

impl TryFrom<RawWeights> for MatchingWeights {
    type Error = WeightsError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        Self::new(raw.skills, raw.experience, raw.education)
    }
}
