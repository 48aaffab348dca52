use serde::Deserialize;

use super::ClassifyError;

/// Classification fields as the model returned them, before vocabulary
/// enforcement.
#[derive(Debug, Clone)]
pub struct RawClassification {
    pub document_type: Option<String>,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    pub requires_review: bool,
}

/// Parse a model response into a classification.
///
/// Models wrap JSON in prose and code fences despite instructions, so
/// this looks for a fenced ```json block first and falls back to the
/// outermost brace pair. Missing fields get defaults rather than errors;
/// only a response with no parseable JSON at all is rejected.
pub fn parse_classification_response(response: &str) -> Result<RawClassification, ClassifyError> {
    let json_str = extract_json_block(response)?;

    #[derive(Deserialize)]
    struct Raw {
        document_type: Option<String>,
        confidence: Option<f64>,
        tags: Option<Vec<serde_json::Value>>,
        extracted_fields: Option<serde_json::Map<String, serde_json::Value>>,
        requires_review: Option<bool>,
    }

    let raw: Raw =
        serde_json::from_str(&json_str).map_err(|e| ClassifyError::JsonParsing(e.to_string()))?;

    // Tags may arrive as numbers or nested values; keep only strings
    let tags = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();

    Ok(RawClassification {
        document_type: raw.document_type,
        confidence: raw.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        tags,
        extracted_fields: raw.extracted_fields.unwrap_or_default(),
        requires_review: raw.requires_review.unwrap_or(false),
    })
}

fn extract_json_block(response: &str) -> Result<String, ClassifyError> {
    if let Some(fence_start) = response.find("```json") {
        let content_start = fence_start + 7;
        let content_end = response[content_start..]
            .find("```")
            .ok_or_else(|| ClassifyError::MalformedResponse("Unclosed JSON block".into()))?;
        return Ok(response[content_start..content_start + content_end]
            .trim()
            .to_string());
    }

    let start = response
        .find('{')
        .ok_or_else(|| ClassifyError::MalformedResponse("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| ClassifyError::MalformedResponse("No JSON object found".into()))?;
    Ok(response[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_json_parses() {
        let raw = parse_classification_response(
            r#"{"document_type": "rental_contract", "confidence": 0.93,
                "tags": ["housing", "legal"],
                "extracted_fields": {"monthly_rent": "950 EUR"}}"#,
        )
        .unwrap();
        assert_eq!(raw.document_type.as_deref(), Some("rental_contract"));
        assert_eq!(raw.confidence, 0.93);
        assert_eq!(raw.tags, vec!["housing", "legal"]);
        assert_eq!(
            raw.extracted_fields.get("monthly_rent").and_then(|v| v.as_str()),
            Some("950 EUR")
        );
    }

    #[test]
    fn fenced_json_with_prose_parses() {
        let response = "Sure! Here is the classification:\n```json\n\
                        {\"document_type\": \"passport\", \"confidence\": 0.88}\n\
                        ```\nLet me know if you need anything else.";
        let raw = parse_classification_response(response).unwrap();
        assert_eq!(raw.document_type.as_deref(), Some("passport"));
        assert!(raw.tags.is_empty());
    }

    #[test]
    fn bare_braces_in_prose_parse() {
        let response = "The answer is {\"document_type\": \"other\"} hope that helps";
        let raw = parse_classification_response(response).unwrap();
        assert_eq!(raw.document_type.as_deref(), Some("other"));
        assert_eq!(raw.confidence, 0.0);
    }

    #[test]
    fn confidence_clamped_to_unit_range() {
        let raw =
            parse_classification_response(r#"{"document_type": "passport", "confidence": 7.5}"#)
                .unwrap();
        assert_eq!(raw.confidence, 1.0);
    }

    #[test]
    fn non_string_tags_dropped() {
        let raw = parse_classification_response(
            r#"{"document_type": "other", "tags": ["legal", 42, {"x": 1}]}"#,
        )
        .unwrap();
        assert_eq!(raw.tags, vec!["legal"]);
    }

    #[test]
    fn requires_review_parsed_and_defaults_false() {
        let raw = parse_classification_response(
            r#"{"document_type": "passport", "requires_review": true}"#,
        )
        .unwrap();
        assert!(raw.requires_review);

        let raw = parse_classification_response(r#"{"document_type": "passport"}"#).unwrap();
        assert!(!raw.requires_review);
    }

    #[test]
    fn no_json_is_malformed() {
        assert!(matches!(
            parse_classification_response("I cannot classify this document."),
            Err(ClassifyError::MalformedResponse(_))
        ));
    }
}
