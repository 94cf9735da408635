use serde::{Deserialize, Serialize};

pub const MIN_SCORE: f32 = 1.0;
pub const MAX_SCORE: f32 = 10.0;

/// What to do with a score outside `[1, 10]`.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutOfRange {
    #[default]
    Clamp,
    Reject,
}

/// How tolerant score parsing is. Local models need more slack than the hosted API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParsePolicy {
    pub out_of_range: OutOfRange,
    /// Treat values in `(10, 100]` as a 100-point scale and divide them by ten.
    pub rescale_percent: bool,
}

impl ParsePolicy {
    /// Hosted models follow the requested scale; stray values are clamped.
    #[must_use]
    pub const fn hosted() -> Self {
        Self {
            out_of_range: OutOfRange::Clamp,
            rescale_percent: false,
        }
    }

    /// Local models sometimes answer on a 100-point scale.
    #[must_use]
    pub const fn local() -> Self {
        Self {
            out_of_range: OutOfRange::Clamp,
            rescale_percent: true,
        }
    }

    #[must_use]
    pub const fn with_out_of_range(self, out_of_range: OutOfRange) -> Self {
        Self {
            out_of_range,
            ..self
        }
    }
}

/// Whether the overall score came from the model or was computed from the sub-scores.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverallSource {
    Reported,
    Derived,
}

/// Free text the model gives alongside its scores.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq, Default)]
pub struct Rationale {
    pub description: Option<String>,
    pub strengths: Option<String>,
    pub improvements: Option<String>,
}

impl Rationale {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.description.is_none() && self.strengths.is_none() && self.improvements.is_none()
    }
}

/// Parsed rubric judgement for one image. Every score is within `[1, 10]`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RubricScores {
    pub composition: f32,
    pub exposure: f32,
    pub color: f32,
    pub focus: f32,
    pub subject: f32,
    pub overall_impression: f32,
    pub overall_score: f32,
    pub overall_source: OverallSource,
    pub rationale: Rationale,
}

impl RubricScores {
    /// The six rubric sub-scores in prompt order.
    #[must_use]
    pub const fn sub_scores(&self) -> [(&'static str, f32); 6] {
        [
            ("composition", self.composition),
            ("exposure", self.exposure),
            ("color", self.color),
            ("focus", self.focus),
            ("subject", self.subject),
            ("overall_impression", self.overall_impression),
        ]
    }

    #[must_use]
    pub fn sub_score_mean(&self) -> f32 {
        let scores = self.sub_scores();
        scores.iter().map(|(_, v)| v).sum::<f32>() / scores.len() as f32
    }

    #[must_use]
    pub fn all_in_range(&self) -> bool {
        self.sub_scores()
            .iter()
            .map(|(_, v)| *v)
            .chain(std::iter::once(self.overall_score))
            .all(|v| (MIN_SCORE..=MAX_SCORE).contains(&v))
    }
}
