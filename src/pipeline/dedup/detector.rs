use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::similarity::{file_name_similarity, jaccard_tokens};
use crate::config::PipelineConfig;
use crate::db::repository::document;
use crate::db::DatabaseError;
use crate::models::Document;
use crate::pipeline::classify::prompt::truncate_on_char_boundary;

/// What made a candidate look like the same document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBasis {
    FileName,
    Content,
    Both,
}

/// A candidate for "this upload is a new version of that document"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarMatch {
    pub document_id: Uuid,
    pub file_name: String,
    pub score: f64,
    pub basis: MatchBasis,
}

/// Scans a user's existing documents for likely earlier versions of an
/// upload. Exact duplicates are someone else's job (the content hash
/// check in the processor); this finds the near misses.
pub struct DuplicateDetector {
    threshold: f64,
    text_window: usize,
    max_matches: usize,
}

impl DuplicateDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            text_window: config.similarity_text_window,
            max_matches: config.max_similarity_matches,
        }
    }

    /// Compare an upload against the user's active documents that have
    /// extracted text. Documents we never managed to read are skipped;
    /// a filename coincidence with an unreadable scan is not evidence.
    /// Returns matches at or above the threshold, best first, capped.
    pub fn find_similar(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        file_name: &str,
        text: &str,
    ) -> Result<Vec<SimilarMatch>, DatabaseError> {
        let candidates = document::list_documents(conn, user_id)?;
        let mut matches: Vec<SimilarMatch> = candidates
            .iter()
            .filter(|doc| doc.extracted_text.is_some())
            .filter_map(|doc| self.score_candidate(doc, file_name, text))
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(self.max_matches);

        if !matches.is_empty() {
            tracing::info!(
                count = matches.len(),
                best_score = matches[0].score,
                "Found similar documents"
            );
        }
        Ok(matches)
    }

    fn score_candidate(
        &self,
        doc: &Document,
        file_name: &str,
        text: &str,
    ) -> Option<SimilarMatch> {
        let name_score = file_name_similarity(file_name, &doc.file_name);

        let upload_text = truncate_on_char_boundary(text, self.text_window);
        let existing = doc.extracted_text.as_deref().unwrap_or("");
        let existing_text = truncate_on_char_boundary(existing, self.text_window);
        let content_score = if upload_text.is_empty() || existing_text.is_empty() {
            0.0
        } else {
            jaccard_tokens(upload_text, existing_text)
        };

        let name_clears = name_score >= self.threshold;
        let content_clears = content_score >= self.threshold;

        let (score, basis) = match (name_clears, content_clears) {
            (true, true) => ((name_score + content_score) / 2.0, MatchBasis::Both),
            (true, false) => (name_score, MatchBasis::FileName),
            (false, true) => (content_score, MatchBasis::Content),
            (false, false) => return None,
        };

        Some(SimilarMatch {
            document_id: doc.id,
            file_name: doc.file_name.clone(),
            score,
            basis,
        })
    }
}
