//! Pipeline configuration.
//!
//! One struct carries every tunable the intake pipeline reads: extraction
//! thresholds, classification window, similarity cutoffs, and the optional
//! AI backend endpoint. `Default` gives the production values; tests
//! override individual fields.

use serde::{Deserialize, Serialize};

/// Tunables for the document intake pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum non-whitespace characters for an extraction to count as usable.
    pub min_extraction_chars: usize,
    /// Below this many characters (or below `ocr_min_confidence`) the OCR
    /// stage retries with its alternate page-segmentation mode.
    pub ocr_retry_chars: usize,
    pub ocr_min_confidence: f32,
    /// Wall-clock budget per OCR mode attempt, in seconds.
    pub ocr_mode_timeout_secs: u64,
    /// Pages rasterized for OCR on PDFs. Scanned uploads are almost always
    /// single-page; rasterizing more is wasted time.
    pub ocr_max_pages: u32,
    /// Characters of extracted text handed to the classifier.
    pub classify_text_window: usize,
    /// Classifications below this confidence are flagged for review.
    pub review_threshold: f64,
    /// Candidate pairs at or above this similarity are reported as
    /// potential versions of the same document.
    pub similarity_threshold: f64,
    /// Characters of text compared when scoring content similarity.
    pub similarity_text_window: usize,
    /// Matches returned per upload, best first.
    pub max_similarity_matches: usize,
    /// Link a new upload to its best match automatically instead of
    /// surfacing the choice.
    pub auto_link: bool,
    /// Minimum similarity for an automatic link when `auto_link` is on.
    pub auto_link_threshold: f64,
    /// Hard ceiling on upload size, in bytes.
    pub max_upload_bytes: i64,
    /// Base URL of the classification backend, e.g. an Ollama instance.
    /// `None` disables AI classification and the keyword fallback runs alone.
    pub ai_endpoint: Option<String>,
    pub ai_model: String,
    /// Multimodal model for the vision extraction fallback, served from
    /// the same endpoint. `None` ends the cascade at OCR.
    pub vision_model: Option<String>,
    /// Request timeout for the classification backend, in seconds.
    pub ai_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_extraction_chars: 50,
            ocr_retry_chars: 100,
            ocr_min_confidence: 0.5,
            ocr_mode_timeout_secs: 20,
            ocr_max_pages: 1,
            classify_text_window: 4000,
            review_threshold: 0.7,
            similarity_threshold: 0.8,
            similarity_text_window: 5000,
            max_similarity_matches: 3,
            auto_link: false,
            auto_link_threshold: 0.9,
            max_upload_bytes: 50 * 1024 * 1024,
            ai_endpoint: None,
            ai_model: "llama3.2".to_string(),
            vision_model: None,
            ai_timeout_secs: 30,
        }
    }
}
