use super::RunContext;
use chrono::{DateTime, Local};
use common_types::{EvaluationResult, RunSummary};
use std::fmt::Write as _;

/// How many of the best images the summary lists.
pub const TOP_COUNT: usize = 10;

/// Scored results, best first. Ties keep listing order.
#[must_use]
pub fn ranked(results: &[EvaluationResult]) -> Vec<&EvaluationResult> {
    let mut scored: Vec<&EvaluationResult> = results.iter().filter(|r| r.scores.is_some()).collect();
    scored.sort_by(|a, b| {
        let a = a.overall_score().unwrap_or_default();
        let b = b.overall_score().unwrap_or_default();
        b.total_cmp(&a)
    });
    scored
}

/// Human readable run report written to `summary.txt`.
#[must_use]
pub fn render_summary(
    results: &[EvaluationResult],
    summary: &RunSummary,
    context: &RunContext,
    generated_at: DateTime<Local>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Photo quality evaluation");
    let _ = writeln!(out, "========================");
    let _ = writeln!(out, "Date:       {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Source:     {}", context.source);
    let _ = writeln!(out, "Backend:    {} ({})", context.backend, context.model);
    let _ = writeln!(out, "Threshold:  {:.1}", summary.threshold);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total images:  {}", summary.total);
    let _ = writeln!(out, "Scored:        {}", summary.scored);
    let _ = writeln!(out, "Failed:        {}", summary.failed);
    for (kind, count) in &summary.failures_by_kind {
        let _ = writeln!(out, "  {kind}: {count}");
    }
    let _ = writeln!(
        out,
        "Good photos:   {} ({:.1}%)",
        summary.good,
        summary.good_percentage()
    );
    match summary.average_score {
        Some(average) => {
            let _ = writeln!(out, "Average score: {average:.2}");
        }
        None => {
            let _ = writeln!(out, "Average score: -");
        }
    }

    let top: Vec<_> = ranked(results).into_iter().take(TOP_COUNT).collect();
    if !top.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Top {} images", top.len());
        let _ = writeln!(out, "------------");
        for (rank, result) in top.iter().enumerate() {
            let Some(scores) = &result.scores else {
                continue;
            };
            let marker = if result.is_good { " *" } else { "" };
            let _ = writeln!(
                out,
                "{:>2}. {} - {:.1}{marker}",
                rank + 1,
                result.name,
                scores.overall_score
            );
            if let Some(description) = &scores.rationale.description {
                let _ = writeln!(out, "    {description}");
            }
            if let Some(strengths) = &scores.rationale.strengths {
                let _ = writeln!(out, "    + {strengths}");
            }
            if let Some(improvements) = &scores.rationale.improvements {
                let _ = writeln!(out, "    - {improvements}");
            }
        }
    }

    let failed: Vec<_> = results.iter().filter(|r| r.is_failed()).collect();
    if !failed.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Failed images");
        let _ = writeln!(out, "-------------");
        for result in failed {
            if let Some(error) = &result.error {
                let _ = writeln!(out, "{}: {error}", result.name);
            }
        }
    }
    out
}
