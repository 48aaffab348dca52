use super::client::client_from_config;
use super::keywords::{classify_by_keywords, default_tags};
use super::parser::parse_classification_response;
use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::types::{
    retain_known_tags, Classification, ClassificationSource, ClassifyClient,
};
use super::ClassifyError;
use crate::config::PipelineConfig;
use crate::models::DocumentType;

/// Two-branch classifier: ask the model, fall back to keywords.
///
/// The keyword branch is not an error path. It is the normal mode for
/// deployments without an AI endpoint, and the safety net when the model
/// is unreachable or returns garbage. Classification itself never fails;
/// the worst outcome is `Other` at low confidence, flagged for review.
pub struct DocumentClassifier {
    client: Box<dyn ClassifyClient + Send + Sync>,
    text_window: usize,
    review_threshold: f64,
}

impl DocumentClassifier {
    pub fn new(
        client: Box<dyn ClassifyClient + Send + Sync>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            client,
            text_window: config.classify_text_window,
            review_threshold: config.review_threshold,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ClassifyError> {
        Ok(Self::new(client_from_config(config)?, config))
    }

    pub fn classify(&self, file_name: &str, text: &str) -> Classification {
        match self.classify_with_model(file_name, text) {
            Ok(classification) => classification,
            Err(ClassifyError::NotConfigured) => {
                tracing::debug!("No AI backend configured, using keyword classification");
                self.classify_with_keywords(file_name, text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Model classification failed, using keyword fallback");
                self.classify_with_keywords(file_name, text)
            }
        }
    }

    fn classify_with_model(
        &self,
        file_name: &str,
        text: &str,
    ) -> Result<Classification, ClassifyError> {
        let prompt = build_prompt(file_name, text, self.text_window);
        let response = self.client.generate(SYSTEM_PROMPT, &prompt)?;
        let raw = parse_classification_response(&response)?;

        let doc_type = raw
            .document_type
            .as_deref()
            .map(DocumentType::parse_lenient)
            .unwrap_or(DocumentType::Other);

        let mut tags = retain_known_tags(&raw.tags);
        if tags.is_empty() {
            tags = default_tags(doc_type);
        }

        // Only flat string fields survive; nested structures get dropped
        let extracted_fields: serde_json::Map<String, serde_json::Value> = raw
            .extracted_fields
            .into_iter()
            .filter(|(_, v)| v.is_string() || v.is_number() || v.is_boolean())
            .collect();

        let confidence = raw.confidence;
        // The model may flag review on its own; low confidence forces it
        Ok(Classification {
            doc_type,
            confidence,
            tags,
            extracted_fields,
            requires_review: raw.requires_review || confidence < self.review_threshold,
            source: ClassificationSource::Model,
        })
    }

    fn classify_with_keywords(&self, file_name: &str, text: &str) -> Classification {
        let m = classify_by_keywords(file_name, text);
        tracing::info!(
            doc_type = m.doc_type.as_str(),
            confidence = m.confidence,
            "Keyword classification"
        );
        Classification {
            doc_type: m.doc_type,
            confidence: m.confidence,
            tags: default_tags(m.doc_type),
            extracted_fields: serde_json::Map::new(),
            requires_review: m.confidence < self.review_threshold,
            source: ClassificationSource::Keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::client::NullClassifyClient;

    struct ScriptedClient {
        response: Result<String, fn() -> ClassifyError>,
    }

    impl ClassifyClient for ScriptedClient {
        fn generate(&self, _system: &str, _prompt: &str) -> Result<String, ClassifyError> {
            match &self.response {
                Ok(r) => Ok(r.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn classifier(client: Box<dyn ClassifyClient + Send + Sync>) -> DocumentClassifier {
        DocumentClassifier::new(client, &PipelineConfig::default())
    }

    #[test]
    fn confident_model_response_passes_through() {
        let c = classifier(Box::new(ScriptedClient {
            response: Ok(r#"{"document_type": "rental_contract", "confidence": 0.93,
                             "tags": ["housing", "legal"],
                             "extracted_fields": {"monthly_rent": "950 EUR"}}"#
                .to_string()),
        }));
        let result = c.classify("lease.pdf", "Mietvertrag über Wohnraum in Berlin");
        assert_eq!(result.doc_type, DocumentType::RentalContract);
        assert_eq!(result.source, ClassificationSource::Model);
        assert!(!result.requires_review);
        assert_eq!(result.tags, vec!["legal", "housing"]);
    }

    #[test]
    fn low_confidence_model_response_flagged_for_review() {
        let c = classifier(Box::new(ScriptedClient {
            response: Ok(r#"{"document_type": "bank_document", "confidence": 0.55}"#.to_string()),
        }));
        let result = c.classify("statement.pdf", "some bank text");
        assert_eq!(result.doc_type, DocumentType::BankDocument);
        assert!(result.requires_review);
        // empty model tags backfilled from type defaults
        assert_eq!(result.tags, vec!["financial"]);
    }

    #[test]
    fn model_flagged_review_sticks_at_high_confidence() {
        let c = classifier(Box::new(ScriptedClient {
            response: Ok(r#"{"document_type": "passport", "confidence": 0.92,
                             "requires_review": true}"#
                .to_string()),
        }));
        let result = c.classify("scan.jpg", "partly legible passport page");
        assert_eq!(result.doc_type, DocumentType::Passport);
        assert!(result.requires_review);
    }

    #[test]
    fn unparseable_model_response_falls_back_to_keywords() {
        let c = classifier(Box::new(ScriptedClient {
            response: Ok("I am sorry, I cannot help with that.".to_string()),
        }));
        let result = c.classify("Mietvertrag.pdf", "Der Vermieter und der Mieter schließen...");
        assert_eq!(result.source, ClassificationSource::Keywords);
        assert_eq!(result.doc_type, DocumentType::RentalContract);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert!(!result.requires_review);
    }

    #[test]
    fn unconfigured_backend_uses_keywords_quietly() {
        let c = classifier(Box::new(NullClassifyClient));
        let result = c.classify("passport_scan.jpg", "passport number P1234567");
        assert_eq!(result.source, ClassificationSource::Keywords);
        assert_eq!(result.doc_type, DocumentType::Passport);
    }

    #[test]
    fn nothing_matches_means_other_under_review() {
        let c = classifier(Box::new(NullClassifyClient));
        let result = c.classify("scan42.png", "completely unrelated content");
        assert_eq!(result.doc_type, DocumentType::Other);
        assert!((result.confidence - 0.3).abs() < 1e-9);
        assert!(result.requires_review);
        assert!(result.tags.is_empty());
    }

    #[test]
    fn unknown_model_type_collapses_to_other() {
        let c = classifier(Box::new(ScriptedClient {
            response: Ok(r#"{"document_type": "tax_return", "confidence": 0.95}"#.to_string()),
        }));
        let result = c.classify("file.pdf", "irrelevant");
        assert_eq!(result.doc_type, DocumentType::Other);
        assert_eq!(result.source, ClassificationSource::Model);
    }
}
