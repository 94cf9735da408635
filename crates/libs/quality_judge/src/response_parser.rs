//! Pulls rubric scores out of free-form model output.
//!
//! Models wrap their JSON in prose or code fences, answer with strings such as `"8/10"`,
//! or drift onto a 100-point scale. Parsing is tolerant about all of that, but never
//! invents a score: anything that cannot be read becomes a [`ParseError`].

use crate::rubric::RUBRIC_FIELDS;
use common_types::{
    MAX_SCORE, MIN_SCORE, OutOfRange, OverallSource, ParsePolicy, Rationale, RubricScores,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

const OVERALL_KEYS: [&str; 4] = ["total_score", "overall_score", "overall", "score"];
const DESCRIPTION_KEYS: [&str; 4] = ["description", "rationale", "reason", "explanation"];
const STRENGTH_KEYS: [&str; 2] = ["strengths", "strength"];
const IMPROVEMENT_KEYS: [&str; 2] = ["improvements", "improvement"];

static NUMERIC_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)\s*(?:/\s*(\d+(?:\.\d+)?))?").expect("numeric pattern is valid")
});

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("no JSON object found in model response")]
    NoJsonObject,
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),
    #[error("field '{field}' is not numeric: {value}")]
    NonNumeric { field: &'static str, value: String },
    #[error("field '{field}' is outside 1-10: {value}")]
    OutOfRange { field: &'static str, value: f32 },
}

/// Parses the first JSON object in `text` into validated rubric scores.
pub fn parse_scores(text: &str, policy: ParsePolicy) -> Result<RubricScores, ParseError> {
    let object = extract_json_object(text).ok_or(ParseError::NoJsonObject)?;
    let fields = normalize_keys(object);
    debug!("Parsed judgement object: {:?}", fields);

    let mut sub_scores = [0.0_f32; 6];
    for (slot, field) in sub_scores.iter_mut().zip(RUBRIC_FIELDS) {
        let value = lookup(&fields, &[field]).ok_or(ParseError::MissingField(field))?;
        *slot = coerce_score(field, value, policy)?;
    }
    let [composition, exposure, color, focus, subject, overall_impression] = sub_scores;

    let (overall_score, overall_source) = match lookup(&fields, &OVERALL_KEYS) {
        Some(value) => (
            coerce_score("total_score", value, policy)?,
            OverallSource::Reported,
        ),
        None => (
            sub_scores.iter().sum::<f32>() / sub_scores.len() as f32,
            OverallSource::Derived,
        ),
    };

    Ok(RubricScores {
        composition,
        exposure,
        color,
        focus,
        subject,
        overall_impression,
        overall_score,
        overall_source,
        rationale: Rationale {
            description: lookup(&fields, &DESCRIPTION_KEYS).and_then(text_value),
            strengths: lookup(&fields, &STRENGTH_KEYS).and_then(text_value),
            improvements: lookup(&fields, &IMPROVEMENT_KEYS).and_then(text_value),
        },
    })
}

/// Finds the first position in `text` where a complete JSON object can be decoded.
/// Whatever follows the object is ignored.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Map<String, Value>>()
            .next()
            .and_then(Result::ok)
    })
}

/// Lowercases keys and turns spaces and dashes into underscores, so `"Overall Impression"`
/// matches `overall_impression`.
fn normalize_keys(object: Map<String, Value>) -> Map<String, Value> {
    object
        .into_iter()
        .map(|(key, value)| {
            let key = key.trim().to_lowercase().replace([' ', '-'], "_");
            (key, value)
        })
        .collect()
}

fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn coerce_score(field: &'static str, value: &Value, policy: ParsePolicy) -> Result<f32, ParseError> {
    let raw = match value {
        Value::Number(n) => n.as_f64().map(|v| v as f32),
        Value::String(s) => numeric_text(s),
        _ => None,
    }
    .filter(|v| v.is_finite())
    .ok_or_else(|| ParseError::NonNumeric {
        field,
        value: value.to_string(),
    })?;

    let mut score = raw;
    if policy.rescale_percent && score > MAX_SCORE && score <= 100.0 {
        debug!("Rescaling {field} from a 100-point scale: {score} -> {}", score / 10.0);
        score /= 10.0;
    }
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        match policy.out_of_range {
            OutOfRange::Clamp => {
                warn!("Score out of range, clamping: {field}={score}");
                score = score.clamp(MIN_SCORE, MAX_SCORE);
            }
            OutOfRange::Reject => return Err(ParseError::OutOfRange { field, value: raw }),
        }
    }
    Ok(score)
}

/// Reads `"8"`, `"7.5 points"` or a fraction such as `"4/5"`, scaled to ten.
fn numeric_text(text: &str) -> Option<f32> {
    let captures = NUMERIC_TEXT.captures(text)?;
    let value: f32 = captures.get(1)?.as_str().parse().ok()?;
    match captures.get(2).and_then(|d| d.as_str().parse::<f32>().ok()) {
        Some(denominator) if denominator > 0.0 => Some(value / denominator * MAX_SCORE),
        Some(_) => None,
        None => Some(value),
    }
}

fn text_value(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(text_value)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Null | Value::Object(_) => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"{
        "composition": 8,
        "exposure": 7,
        "color": 6.5,
        "focus": 9,
        "subject": 8,
        "overall_impression": 7,
        "total_score": 7.5,
        "strengths": "Strong leading lines",
        "improvements": "Horizon is tilted",
        "description": "A pier at sunset"
    }"#;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn parses_clean_json() -> Result<(), ParseError> {
        let scores = parse_scores(FULL, ParsePolicy::hosted())?;
        assert!(approx(scores.composition, 8.0));
        assert!(approx(scores.color, 6.5));
        assert!(approx(scores.overall_score, 7.5));
        assert_eq!(scores.overall_source, OverallSource::Reported);
        assert_eq!(scores.rationale.description.as_deref(), Some("A pier at sunset"));
        assert_eq!(scores.rationale.strengths.as_deref(), Some("Strong leading lines"));
        assert_eq!(scores.rationale.improvements.as_deref(), Some("Horizon is tilted"));
        Ok(())
    }

    #[test]
    fn recovers_json_wrapped_in_prose_and_fences() -> Result<(), ParseError> {
        let text = format!(
            "Sure! Here is my evaluation of the photo:\n```json\n{FULL}\n```\nLet me know {{if}} you need more."
        );
        let wrapped = parse_scores(&text, ParsePolicy::hosted())?;
        let clean = parse_scores(FULL, ParsePolicy::hosted())?;
        assert_eq!(wrapped, clean);
        Ok(())
    }

    #[test]
    fn skips_braces_that_are_not_json() -> Result<(), ParseError> {
        let text = format!("Scores use the {{rubric}} format. {FULL}");
        let scores = parse_scores(&text, ParsePolicy::hosted())?;
        assert!(approx(scores.focus, 9.0));
        Ok(())
    }

    #[test]
    fn missing_field_fails_without_partial_scores() {
        let text = r#"{"composition": 8, "exposure": 7, "color": 6, "focus": 9, "subject": 8, "total_score": 8}"#;
        let result = parse_scores(text, ParsePolicy::hosted());
        assert_eq!(result, Err(ParseError::MissingField("overall_impression")));
    }

    #[test]
    fn null_counts_as_missing() {
        let text = r#"{"composition": null, "exposure": 7, "color": 6, "focus": 9, "subject": 8, "overall_impression": 5}"#;
        assert_eq!(
            parse_scores(text, ParsePolicy::hosted()),
            Err(ParseError::MissingField("composition"))
        );
    }

    #[test]
    fn no_object_is_an_error() {
        assert_eq!(
            parse_scores("I cannot evaluate this image.", ParsePolicy::local()),
            Err(ParseError::NoJsonObject)
        );
        assert_eq!(
            parse_scores("[1, 2, 3]", ParsePolicy::local()),
            Err(ParseError::NoJsonObject)
        );
    }

    #[test]
    fn word_scores_are_rejected_not_defaulted() {
        let text = r#"{"composition": "excellent", "exposure": 7, "color": 6, "focus": 9, "subject": 8, "overall_impression": 5}"#;
        assert!(matches!(
            parse_scores(text, ParsePolicy::local()),
            Err(ParseError::NonNumeric { field: "composition", .. })
        ));
    }

    #[test]
    fn derives_overall_from_mean_when_absent() -> Result<(), ParseError> {
        let text = r#"{"composition": 6, "exposure": 7, "color": 8, "focus": 9, "subject": 4, "overall_impression": 2}"#;
        let scores = parse_scores(text, ParsePolicy::hosted())?;
        assert!(approx(scores.overall_score, 6.0));
        assert_eq!(scores.overall_source, OverallSource::Derived);
        assert!(scores.rationale.is_empty());
        Ok(())
    }

    #[test]
    fn accepts_alternative_overall_keys_and_spelling() -> Result<(), ParseError> {
        let text = r#"{"Composition": 6, "Exposure": 7, "Color": 8, "Focus": 9, "Subject": 4,
                       "Overall Impression": 2, "overall_score": 9.5, "rationale": ["sharp", "vivid"]}"#;
        let scores = parse_scores(text, ParsePolicy::hosted())?;
        assert!(approx(scores.overall_impression, 2.0));
        assert!(approx(scores.overall_score, 9.5));
        assert_eq!(scores.overall_source, OverallSource::Reported);
        assert_eq!(scores.rationale.description.as_deref(), Some("sharp; vivid"));
        Ok(())
    }

    #[test]
    fn coerces_numeric_strings() -> Result<(), ParseError> {
        let text = r#"{"composition": "8/10", "exposure": "7", "color": " 6.5 points", "focus": "4/5",
                       "subject": "80/100", "overall_impression": 5, "total_score": "7.0"}"#;
        let scores = parse_scores(text, ParsePolicy::hosted())?;
        assert!(approx(scores.composition, 8.0));
        assert!(approx(scores.exposure, 7.0));
        assert!(approx(scores.color, 6.5));
        assert!(approx(scores.focus, 8.0));
        assert!(approx(scores.subject, 8.0));
        assert!(approx(scores.overall_score, 7.0));
        Ok(())
    }

    #[test]
    fn local_policy_rescales_hundred_point_answers() -> Result<(), ParseError> {
        let text = r#"{"composition": 80, "exposure": 45, "color": 15, "focus": 9, "subject": 250,
                       "overall_impression": 0, "total_score": 75}"#;
        let scores = parse_scores(text, ParsePolicy::local())?;
        assert!(approx(scores.composition, 8.0));
        assert!(approx(scores.exposure, 4.5));
        assert!(approx(scores.color, 1.5));
        assert!(approx(scores.focus, 9.0));
        assert!(approx(scores.subject, 10.0));
        assert!(approx(scores.overall_impression, 1.0));
        assert!(approx(scores.overall_score, 7.5));
        assert!(scores.all_in_range());
        Ok(())
    }

    #[test]
    fn hosted_policy_clamps_without_rescaling() -> Result<(), ParseError> {
        let text = r#"{"composition": 80, "exposure": 7, "color": 6, "focus": 9, "subject": 8,
                       "overall_impression": 5, "total_score": 8}"#;
        let scores = parse_scores(text, ParsePolicy::hosted())?;
        assert!(approx(scores.composition, 10.0));
        Ok(())
    }

    #[test]
    fn reject_policy_refuses_out_of_range() {
        let policy = ParsePolicy {
            out_of_range: OutOfRange::Reject,
            rescale_percent: false,
        };
        let text = r#"{"composition": 8, "exposure": 7, "color": 6, "focus": 9, "subject": 8,
                       "overall_impression": 5, "total_score": 11}"#;
        assert_eq!(
            parse_scores(text, policy),
            Err(ParseError::OutOfRange {
                field: "total_score",
                value: 11.0
            })
        );
    }
}
