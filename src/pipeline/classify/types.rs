use serde::{Deserialize, Serialize};

use super::ClassifyError;
use crate::models::DocumentType;

/// Closed tag vocabulary. Model output gets filtered against this list;
/// the keyword fallback only ever emits from it.
pub const TAG_VOCABULARY: &[&str] = &[
    "identity",
    "legal",
    "housing",
    "employment",
    "financial",
    "health",
    "education",
    "official",
    "residence",
    "insurance",
    "family",
    "travel",
];

/// Outcome of classifying one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub doc_type: DocumentType,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    pub requires_review: bool,
    pub source: ClassificationSource,
}

/// Which branch produced the classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    Keywords,
}

/// Text-generation backend abstraction (allows mocking for tests)
pub trait ClassifyClient {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, ClassifyError>;
}

/// Keep only tags from the closed vocabulary, lowercased, deduplicated,
/// in vocabulary order.
pub fn retain_known_tags(raw: &[String]) -> Vec<String> {
    let lowered: Vec<String> = raw.iter().map(|t| t.trim().to_lowercase()).collect();
    TAG_VOCABULARY
        .iter()
        .filter(|known| lowered.iter().any(|t| t == *known))
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tags_dropped() {
        let raw = vec![
            "Housing".to_string(),
            "blockchain".to_string(),
            "legal".to_string(),
        ];
        assert_eq!(retain_known_tags(&raw), vec!["legal", "housing"]);
    }

    #[test]
    fn duplicates_collapse() {
        let raw = vec!["identity".to_string(), "IDENTITY ".to_string()];
        assert_eq!(retain_known_tags(&raw), vec!["identity"]);
    }
}
