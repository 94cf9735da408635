use crate::{ImageRecord, RubricScores};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network failure, timeout or non-success response from the backend.
    Api,
    /// The model answered, but no usable scores could be extracted.
    Parse,
    /// The image bytes could not be decoded or re-encoded.
    Image,
    /// The worker task evaluating the image died.
    Task,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Parse => "parse",
            Self::Image => "image",
            Self::Task => "task",
        }
    }

    /// Whether another attempt could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Api | Self::Parse)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReason {
    #[must_use]
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// Outcome of evaluating one image. Created once, never mutated afterwards.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EvaluationResult {
    pub name: String,
    pub source_path: String,
    pub scores: Option<RubricScores>,
    pub error: Option<FailureReason>,
    pub is_good: bool,
    /// Number of evaluation attempts spent on this image.
    pub attempts: u32,
}

impl EvaluationResult {
    #[must_use]
    pub fn scored(image: &ImageRecord, scores: RubricScores, threshold: f32, attempts: u32) -> Self {
        Self {
            name: image.name.clone(),
            source_path: image.source_path.clone(),
            is_good: scores.overall_score >= threshold,
            scores: Some(scores),
            error: None,
            attempts,
        }
    }

    #[must_use]
    pub fn failed(image: &ImageRecord, reason: FailureReason, attempts: u32) -> Self {
        Self {
            name: image.name.clone(),
            source_path: image.source_path.clone(),
            scores: None,
            error: Some(reason),
            is_good: false,
            attempts,
        }
    }

    #[must_use]
    pub fn overall_score(&self) -> Option<f32> {
        self.scores.as_ref().map(|s| s.overall_score)
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Counts reported at the end of every run, regardless of partial failures.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub scored: usize,
    pub failed: usize,
    pub good: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    /// Mean overall score of the scored images, `None` when nothing was scored.
    pub average_score: Option<f32>,
    pub threshold: f32,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[EvaluationResult], threshold: f32) -> Self {
        let mut failures_by_kind = BTreeMap::new();
        for reason in results.iter().filter_map(|r| r.error.as_ref()) {
            *failures_by_kind.entry(reason.kind).or_insert(0) += 1;
        }
        let overall: Vec<f32> = results.iter().filter_map(EvaluationResult::overall_score).collect();
        let average_score =
            (!overall.is_empty()).then(|| overall.iter().sum::<f32>() / overall.len() as f32);

        Self {
            total: results.len(),
            scored: overall.len(),
            failed: results.iter().filter(|r| r.is_failed()).count(),
            good: results.iter().filter(|r| r.is_good).count(),
            failures_by_kind,
            average_score,
            threshold,
        }
    }

    #[must_use]
    pub fn good_percentage(&self) -> f32 {
        if self.total == 0 {
            return 0.0;
        }
        self.good as f32 / self.total as f32 * 100.0
    }
}
