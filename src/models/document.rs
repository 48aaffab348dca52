use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DocumentType, ProcessingStatus};

/// A logical document owned by one user. Carries the metadata of its
/// current version; the full history lives in `document_versions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub extracted_text: Option<String>,
    pub doc_type: DocumentType,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    pub language: String,
    pub requires_review: bool,
    pub status: ProcessingStatus,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One immutable entry in a document's version log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i64,
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub extracted_text: Option<String>,
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    pub uploaded_by: Uuid,
    pub uploaded_at: DateTime<Utc>,
    pub parent_version_id: Option<Uuid>,
    pub change_summary: Option<String>,
    pub is_current: bool,
}

impl Document {
    /// Fresh record for a first upload, before extraction has run.
    pub fn new(user_id: Uuid, file_name: String, media_type: String, size_bytes: i64, content_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            file_name,
            media_type,
            size_bytes,
            content_hash,
            extracted_text: None,
            doc_type: DocumentType::Other,
            confidence: 0.0,
            tags: Vec::new(),
            extracted_fields: serde_json::Map::new(),
            language: "en".to_string(),
            requires_review: false,
            status: ProcessingStatus::Pending,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}
