//! Parse model output into typed domain values

use crate::LlmError;
use arbora_domain::{BackstopPrediction, FieldValue, Intent, Section, ServiceKind, UpdateEnvelope};
use serde_json::Value;
use tracing::warn;

/// Extract JSON from a model response, handling markdown code blocks
pub fn extract_json(response: &str) -> Result<String, LlmError> {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        let lines: Vec<&str> = trimmed.lines().collect();
        if lines.len() < 2 {
            return Err(LlmError::InvalidResponse("empty code block".to_string()));
        }
        // skip first line (```json or ```) and last line (```)
        let json_lines = &lines[1..lines.len().saturating_sub(1)];
        Ok(json_lines.join("\n"))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Parse an intent response
///
/// Accepts either a bare wire label (`"PROVIDE_STATEMENT"`) or an object
/// with an `intent` key.
pub fn parse_intent(response: &str) -> Result<Intent, LlmError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("intent JSON parse error: {}", e)))?;

    let label = match &json {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj
            .get("intent")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                LlmError::InvalidResponse("missing or invalid 'intent' key".to_string())
            })?,
        other => {
            return Err(LlmError::InvalidResponse(format!(
                "unexpected intent shape: {}",
                other
            )))
        }
    };

    match label.trim().to_uppercase().as_str() {
        "PROVIDE_STATEMENT" => Ok(Intent::ProvideStatement),
        "REQUEST_SERVICE" => Ok(Intent::RequestService),
        other => Err(LlmError::InvalidResponse(format!(
            "unknown intent label: {}",
            other
        ))),
    }
}

/// Parse an extraction response into an update envelope
///
/// Accepts the canonical wire shape `{"updates": {...}}` or a bare field
/// map. Unconvertible values (bare objects) are dropped with a warning
/// rather than failing the whole envelope.
pub fn parse_envelope(response: &str) -> Result<UpdateEnvelope, LlmError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("envelope JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse("expected a JSON object".to_string()))?;

    let updates = match obj.get("updates") {
        Some(Value::Object(inner)) => inner,
        Some(other) => {
            return Err(LlmError::InvalidResponse(format!(
                "'updates' must be an object, got: {}",
                other
            )))
        }
        None => obj,
    };

    let mut envelope = UpdateEnvelope::new();
    for (path, raw) in updates {
        match FieldValue::from_json(raw.clone()) {
            Ok(value) => envelope.insert(path.clone(), value),
            Err(e) => warn!(path = %path, "dropping unconvertible field value: {}", e),
        }
    }
    Ok(envelope)
}

/// Parse a backstop response into a prediction
///
/// Expects `{"service": "...", "section": "...|null", "confidence": 0.x}`.
/// An unknown service label is an invalid response; an unparseable section
/// degrades to `None`; a missing confidence degrades to `0.0` so the router
/// threshold rejects it.
pub fn parse_backstop(response: &str) -> Result<BackstopPrediction, LlmError> {
    let json_str = extract_json(response)?;
    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| LlmError::InvalidResponse(format!("backstop JSON parse error: {}", e)))?;

    let obj = json
        .as_object()
        .ok_or_else(|| LlmError::InvalidResponse("expected a JSON object".to_string()))?;

    let service_label = obj
        .get("service")
        .and_then(|v| v.as_str())
        .ok_or_else(|| LlmError::InvalidResponse("missing or invalid 'service'".to_string()))?;
    let service = ServiceKind::parse(service_label).ok_or_else(|| {
        LlmError::InvalidResponse(format!("unknown service label: {}", service_label))
    })?;

    let section = obj
        .get("section")
        .and_then(|v| v.as_str())
        .and_then(Section::parse);

    let confidence = obj.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.0);

    Ok(BackstopPrediction {
        service,
        section,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let response = "```json\n{\"intent\": \"PROVIDE_STATEMENT\"}\n```";
        assert_eq!(
            extract_json(response).unwrap(),
            "{\"intent\": \"PROVIDE_STATEMENT\"}"
        );
    }

    #[test]
    fn test_extract_json_raw_passthrough() {
        assert_eq!(extract_json("  {\"a\": 1}  ").unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_intent_object_and_bare() {
        assert_eq!(
            parse_intent("{\"intent\": \"REQUEST_SERVICE\"}").unwrap(),
            Intent::RequestService
        );
        assert_eq!(
            parse_intent("\"provide_statement\"").unwrap(),
            Intent::ProvideStatement
        );
        assert!(parse_intent("{\"intent\": \"SHRUG\"}").is_err());
    }

    #[test]
    fn test_parse_envelope_wire_shape() {
        let response = r#"{"updates": {"tree_description.dbh_in": "26", "tree_description.defects": ["included bark"]}}"#;
        let envelope = parse_envelope(response).unwrap();
        assert_eq!(
            envelope.provided_paths(),
            vec!["tree_description.dbh_in", "tree_description.defects"]
        );
    }

    #[test]
    fn test_parse_envelope_bare_map_and_nulls() {
        let response = r#"{"tree_description.height_ft": 60, "tree_description.crown_shape": null}"#;
        let envelope = parse_envelope(response).unwrap();
        // numbers coerce to strings, nulls become not-provided
        assert_eq!(envelope.provided_paths(), vec!["tree_description.height_ft"]);
    }

    #[test]
    fn test_parse_backstop() {
        let response =
            r#"{"service": "SECTION_SUMMARY", "section": "risks", "confidence": 0.82}"#;
        let prediction = parse_backstop(response).unwrap();
        assert_eq!(prediction.service, ServiceKind::SectionSummary);
        assert_eq!(prediction.section, Some(Section::Risks));
        assert_eq!(prediction.confidence, 0.82);
    }

    #[test]
    fn test_parse_backstop_degrades_gracefully() {
        let prediction = parse_backstop(r#"{"service": "NONE", "section": "somewhere"}"#).unwrap();
        assert_eq!(prediction.service, ServiceKind::None);
        assert_eq!(prediction.section, None);
        assert_eq!(prediction.confidence, 0.0);

        assert!(parse_backstop(r#"{"service": "REFORMAT_DISK"}"#).is_err());
        assert!(parse_backstop("not json at all").is_err());
    }
}
