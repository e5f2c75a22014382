//! Extraction and validation of the model's free-text answer.
//!
//! The model is asked for a single JSON object but in practice wraps it in
//! code fences, prose, or stray whitespace. The cleanup here is a fixed
//! contract: trim, drop fence lines, bound to the outermost braces, parse,
//! then check key presence. Pure functions, no I/O.

use serde_json::Value;
use sprout_schema::{AssessmentResult, HealthAssessment, IrrigationDecision};

use crate::error::PipelineError;

const HEALTH_KEYS: [&str; 3] = ["health_level", "reasons", "suggestions"];
const IRRIGATION_KEYS: [&str; 5] = [
    "should_water",
    "water_ml",
    "target_soil_moisture_percent_min",
    "target_soil_moisture_percent_max",
    "note",
];

/// Trim and, when the answer is fenced, drop every line that is a fence
/// marker. Fences are tolerated anywhere in the body, not just at the
/// edges.
pub fn strip_code_fences(raw: &str) -> String {
    let content = raw.trim();
    if !content.starts_with("```") {
        return content.to_string();
    }
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Substring from the first `{` to the last `}` inclusive.
pub fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if start < end {
        Some(text[start..=end].trim())
    } else {
        None
    }
}

/// Turn raw model text into a validated [`AssessmentResult`] or fail with
/// `InvalidAssessment` carrying the cleaned text for diagnostics.
pub fn validate_assessment(raw: &str) -> Result<AssessmentResult, PipelineError> {
    let cleaned = strip_code_fences(raw);
    let span = extract_object_span(&cleaned).ok_or_else(|| {
        PipelineError::invalid("no JSON object found in model output", cleaned.clone())
    })?;

    let root: Value = serde_json::from_str(span).map_err(|e| {
        PipelineError::invalid(format!("model output is not valid JSON: {e}"), span)
    })?;

    // Extra top-level keys are tolerated. Only these two are required.
    let health_value = root
        .get("health")
        .ok_or_else(|| PipelineError::invalid("missing 'health' key", span))?;
    let irrigation_value = root
        .get("irrigation")
        .ok_or_else(|| PipelineError::invalid("missing 'irrigation' key", span))?;

    for key in HEALTH_KEYS {
        if health_value.get(key).is_none() {
            return Err(PipelineError::invalid(
                format!("missing key in health: {key}"),
                span,
            ));
        }
    }
    for key in IRRIGATION_KEYS {
        if irrigation_value.get(key).is_none() {
            return Err(PipelineError::invalid(
                format!("missing key in irrigation: {key}"),
                span,
            ));
        }
    }

    // A non-array `reasons` degrades to a single-element list instead of
    // failing the cycle.
    let mut health_value = health_value.clone();
    if !health_value["reasons"].is_array() {
        let coerced = value_as_display_string(&health_value["reasons"]);
        health_value["reasons"] = Value::Array(vec![Value::String(coerced)]);
    }

    let health: HealthAssessment = serde_json::from_value(health_value)
        .map_err(|e| PipelineError::invalid(format!("health section malformed: {e}"), span))?;
    let irrigation: IrrigationDecision = serde_json::from_value(irrigation_value.clone())
        .map_err(|e| PipelineError::invalid(format!("irrigation section malformed: {e}"), span))?;

    Ok(AssessmentResult { health, irrigation })
}

fn value_as_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "health": {
            "health_level": 4,
            "reasons": ["need more light"],
            "suggestions": ["Move closer to a window.", "Rotate weekly."]
        },
        "irrigation": {
            "should_water": true,
            "water_ml": 150,
            "target_soil_moisture_percent_min": 45,
            "target_soil_moisture_percent_max": 60,
            "note": "Soil is dry and no rain expected."
        }
    }"#;

    #[test]
    fn integral_float_numerics_validate() {
        let raw = r#"{
            "health": {"health_level": 4.0, "reasons": ["healthy"], "suggestions": []},
            "irrigation": {"should_water": true, "water_ml": 150.0,
                "target_soil_moisture_percent_min": 45.0,
                "target_soil_moisture_percent_max": 60.0,
                "note": "Soil is dry."}
        }"#;
        let result = validate_assessment(raw).unwrap();
        assert_eq!(result.health.health_level, 4);
        assert_eq!(result.irrigation.water_ml, 150);
    }

    #[test]
    fn plain_object_parses() {
        let result = validate_assessment(WELL_FORMED).unwrap();
        assert_eq!(result.health.health_level, 4);
        assert_eq!(result.health.reasons, vec!["need more light"]);
        assert!(result.irrigation.should_water);
        assert_eq!(result.irrigation.water_ml, 150);
    }

    #[test]
    fn json_fence_wrapper_is_equivalent_to_plain() {
        let fenced = format!("```json\n{WELL_FORMED}\n```");
        let plain = validate_assessment(WELL_FORMED).unwrap();
        let unfenced = validate_assessment(&fenced).unwrap();
        assert_eq!(
            serde_json::to_value(&plain).unwrap(),
            serde_json::to_value(&unfenced).unwrap()
        );
    }

    #[test]
    fn whitespace_and_fences_anywhere_are_tolerated() {
        let messy = format!("\n\n```\n```json\n{WELL_FORMED}\n```\n\n");
        let result = validate_assessment(&messy).unwrap();
        assert_eq!(result.health.health_level, 4);
    }

    #[test]
    fn cleanup_is_idempotent() {
        let fenced = format!("```json\n{WELL_FORMED}\n```");
        let once = strip_code_fences(&fenced);
        let twice = strip_code_fences(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn surrounding_prose_is_dropped_by_brace_bounding() {
        let chatty = format!("Sure! Here is the assessment:\n{WELL_FORMED}\nHope that helps.");
        let result = validate_assessment(&chatty).unwrap();
        assert_eq!(result.irrigation.water_ml, 150);
    }

    #[test]
    fn no_braces_fails_as_invalid_assessment() {
        let err = validate_assessment("the plant looks fine").unwrap_err();
        match err {
            PipelineError::InvalidAssessment { reason, .. } => {
                assert!(reason.contains("no JSON object"));
            }
            other => panic!("expected InvalidAssessment, got {other:?}"),
        }
    }

    #[test]
    fn reversed_braces_fail() {
        assert!(matches!(
            validate_assessment("} nope {").unwrap_err(),
            PipelineError::InvalidAssessment { .. }
        ));
    }

    #[test]
    fn unparsable_span_keeps_cleaned_text_for_diagnostics() {
        let err = validate_assessment("```\n{not json at all}\n```").unwrap_err();
        match err {
            PipelineError::InvalidAssessment { raw, .. } => {
                assert_eq!(raw, "{not json at all}");
            }
            other => panic!("expected InvalidAssessment, got {other:?}"),
        }
    }

    #[test]
    fn missing_top_level_key_is_named() {
        let err = validate_assessment(r#"{"health": {}}"#).unwrap_err();
        match err {
            PipelineError::InvalidAssessment { reason, .. } => {
                assert!(reason.contains("'irrigation'"));
            }
            other => panic!("expected InvalidAssessment, got {other:?}"),
        }
    }

    #[test]
    fn missing_inner_key_is_named() {
        let raw = r#"{
            "health": {"health_level": 3, "reasons": ["healthy"], "suggestions": []},
            "irrigation": {"should_water": false, "water_ml": 0, "note": "skip"}
        }"#;
        let err = validate_assessment(raw).unwrap_err();
        match err {
            PipelineError::InvalidAssessment { reason, .. } => {
                assert!(reason.contains("target_soil_moisture_percent_min"));
            }
            other => panic!("expected InvalidAssessment, got {other:?}"),
        }
    }

    #[test]
    fn extra_top_level_keys_are_tolerated() {
        let raw = format!(
            "{{\"confidence\": 0.9, \"health\": {health}, \"irrigation\": {irrigation}}}",
            health = r#"{"health_level": 5, "reasons": ["healthy"], "suggestions": ["Keep it up."]}"#,
            irrigation = r#"{"should_water": false, "water_ml": 0, "target_soil_moisture_percent_min": 40, "target_soil_moisture_percent_max": 55, "note": "No watering needed."}"#,
        );
        let result = validate_assessment(&raw).unwrap();
        assert_eq!(result.health.health_level, 5);
    }

    #[test]
    fn scalar_reasons_coerces_to_single_element_list() {
        let raw = r#"{
            "health": {"health_level": 2, "reasons": "pest suspected", "suggestions": []},
            "irrigation": {"should_water": false, "water_ml": 0, "target_soil_moisture_percent_min": 40, "target_soil_moisture_percent_max": 55, "note": "Hold off."}
        }"#;
        let result = validate_assessment(raw).unwrap();
        assert_eq!(result.health.reasons, vec!["pest suspected"]);
    }

    #[test]
    fn out_of_range_values_pass_through_unclamped() {
        let raw = r#"{
            "health": {"health_level": 9, "reasons": ["healthy"], "suggestions": []},
            "irrigation": {"should_water": false, "water_ml": -20, "target_soil_moisture_percent_min": 40, "target_soil_moisture_percent_max": 55, "note": "odd"}
        }"#;
        let result = validate_assessment(raw).unwrap();
        assert_eq!(result.health.health_level, 9);
        assert_eq!(result.irrigation.water_ml, -20);
    }

    #[test]
    fn water_ml_zero_with_should_water_true_is_tolerated() {
        let raw = r#"{
            "health": {"health_level": 5, "reasons": ["healthy"], "suggestions": []},
            "irrigation": {"should_water": true, "water_ml": 0, "target_soil_moisture_percent_min": 40, "target_soil_moisture_percent_max": 55, "note": "Light mist only."}
        }"#;
        let result = validate_assessment(raw).unwrap();
        assert!(result.irrigation.should_water);
        assert_eq!(result.irrigation.water_ml, 0);
    }
}
