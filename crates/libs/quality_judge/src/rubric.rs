/// The six rubric dimensions, in the order the prompt lists them.
pub const RUBRIC_FIELDS: [&str; 6] = [
    "composition",
    "exposure",
    "color",
    "focus",
    "subject",
    "overall_impression",
];

/// Prompt sent with every image. Asks for one JSON object with a 1-10 score per rubric
/// dimension, an overall score and a short rationale.
pub const RUBRIC_PROMPT: &str = r#"
You are an expert in evaluating photo quality.
Evaluate the given photo on a scale of 1 to 10 for each of the following aspects:

1. Composition (balance, framing, visual flow)
2. Exposure (brightness, contrast, dynamic range)
3. Color (color balance, saturation, color temperature)
4. Focus (sharpness, depth of field, bokeh quality)
5. Subject (clarity of subject, expressiveness, appeal)
6. Overall impression (emotional impact, memorability)

Use the following meanings for each score: 1 = very poor, 5 = meh, 6 = acceptable, 7 = good, 8 = great, 9 = beautiful, 10 = impossibly good.
Use a realistic distribution for scores. Most average photos fall between 4 and 7.
Also give a total score from 1 to 10 and briefly explain the strengths of the photo and what could be improved.

Respond with a single JSON object in exactly this format:
{
  "composition": number,
  "exposure": number,
  "color": number,
  "focus": number,
  "subject": number,
  "overall_impression": number,
  "total_score": number,
  "strengths": "strengths of the photo",
  "improvements": "areas for improvement",
  "description": "brief description of the photo"
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_every_rubric_field() {
        for field in RUBRIC_FIELDS {
            assert!(RUBRIC_PROMPT.contains(&format!("\"{field}\"")), "{field} missing");
        }
        assert!(RUBRIC_PROMPT.contains("\"total_score\""));
    }
}
