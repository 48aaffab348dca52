//! End-to-end intake: one upload in, one stored document (or version) out.
//!
//! Order matters here. The content hash is checked before any expensive
//! work so exact re-uploads cost one SELECT. Extraction and classification
//! never abort the pipeline: a document we could not read is stored
//! anyway, flagged for review, because the user's file must not vanish
//! into an error message.

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::db::repository::{document, version};
use crate::db::DatabaseError;
use crate::models::{Document, DocumentVersion, ProcessingStatus};
use crate::pipeline::classify::{ClassifyError, DocumentClassifier};
use crate::pipeline::dedup::{DuplicateDetector, SimilarMatch};
use crate::pipeline::extraction::{ExtractionCascade, ExtractionResult};
use crate::pipeline::intake::{
    compute_content_hash, detect_format, sanitize_file_name, FileCategory, IntakeError,
};
use crate::pipeline::lineage::{self, LineageError, NewVersionInput, VersionComparison};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Lineage error: {0}")]
    Lineage(#[from] LineageError),

    #[error("Classifier setup failed: {0}")]
    ClassifierSetup(#[from] ClassifyError),

    #[error("Cannot link to document {0}: not found for this user")]
    LinkTargetNotFound(Uuid),

    #[error("Document {0} not found for this user")]
    DocumentNotFound(Uuid),
}

/// One incoming upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub user_id: Uuid,
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Existing document this upload is a new version of, when the user
    /// already made that call.
    pub link_to: Option<Uuid>,
}

/// What the pipeline did with an upload
#[derive(Debug)]
pub enum ProcessOutcome {
    /// New document created; any similar existing documents are
    /// surfaced so the user can link them after the fact.
    Created {
        document: Document,
        version: DocumentVersion,
        similar: Vec<SimilarMatch>,
    },
    /// Upload became a new version of an existing document, either by
    /// explicit request or by the auto-link policy.
    Versioned {
        document: Document,
        version: DocumentVersion,
        auto_linked: bool,
    },
    /// Byte-identical to an active document; nothing stored.
    ExactDuplicate { existing: Document },
}

pub struct DocumentProcessor {
    config: PipelineConfig,
    cascade: ExtractionCascade,
    classifier: DocumentClassifier,
    detector: DuplicateDetector,
}

impl DocumentProcessor {
    /// Processor wired to the default engines: poppler and tesseract
    /// CLIs for extraction, the configured endpoint (or the keyword
    /// fallback) for classification.
    pub fn new(config: PipelineConfig) -> Result<Self, ProcessorError> {
        let cascade = ExtractionCascade::with_defaults(&config);
        let classifier = DocumentClassifier::from_config(&config)?;
        let detector = DuplicateDetector::new(&config);
        Ok(Self {
            config,
            cascade,
            classifier,
            detector,
        })
    }

    /// Full dependency injection, for tests and embedders.
    pub fn with_components(
        config: PipelineConfig,
        cascade: ExtractionCascade,
        classifier: DocumentClassifier,
    ) -> Self {
        let detector = DuplicateDetector::new(&config);
        Self {
            config,
            cascade,
            classifier,
            detector,
        }
    }

    /// Run the whole intake pipeline for one upload.
    pub fn process_upload(
        &self,
        conn: &Connection,
        request: UploadRequest,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let file_name = sanitize_file_name(&request.file_name);
        tracing::info!(
            user_id = %request.user_id,
            file_name = %file_name,
            size = request.bytes.len(),
            "Processing upload"
        );

        if request.bytes.len() as i64 > self.config.max_upload_bytes {
            return Err(IntakeError::FileTooLarge {
                size_mb: request.bytes.len() as f64 / (1024.0 * 1024.0),
                max_mb: self.config.max_upload_bytes / (1024 * 1024),
            }
            .into());
        }

        let format = detect_format(&file_name, &request.bytes)?;
        if format.category == FileCategory::Unsupported {
            return Err(IntakeError::UnsupportedFormat(format.media_type).into());
        }

        let content_hash = compute_content_hash(&request.bytes);
        if let Some(existing) =
            document::get_document_by_hash(conn, &request.user_id, &content_hash)?
        {
            tracing::info!(existing_id = %existing.id, "Exact duplicate upload rejected");
            return Ok(ProcessOutcome::ExactDuplicate { existing });
        }

        let (extraction, extraction_failed) =
            match self.cascade.extract(format.category, &request.bytes) {
                Ok(result) => (result, false),
                Err(e) => {
                    tracing::warn!(error = %e, "Extraction failed, storing document unread");
                    (empty_extraction(), true)
                }
            };

        let mut classification = self.classifier.classify(&file_name, &extraction.text);
        // A below-bar or failed extraction always goes to review, no
        // matter how confident the classifier was about the file name
        if extraction_failed || !extraction.quality_met {
            classification.requires_review = true;
        }

        // Explicit link wins over everything else
        if let Some(target) = request.link_to {
            return self.append_version(
                conn, &request, target, &file_name, &format.media_type, content_hash,
                &extraction, &classification, false,
            );
        }

        let similar =
            self.detector
                .find_similar(conn, &request.user_id, &file_name, &extraction.text)?;

        if self.config.auto_link {
            if let Some(best) = similar.first() {
                if best.score >= self.config.auto_link_threshold {
                    tracing::info!(
                        target = %best.document_id,
                        score = best.score,
                        "Auto-linking upload as new version"
                    );
                    return self.append_version(
                        conn, &request, best.document_id, &file_name, &format.media_type,
                        content_hash, &extraction, &classification, true,
                    );
                }
            }
        }

        // New document
        let mut doc = Document::new(
            request.user_id,
            file_name,
            format.media_type,
            format.size_bytes,
            content_hash,
        );
        doc.extracted_text = non_empty(&extraction.text);
        doc.doc_type = classification.doc_type;
        doc.confidence = classification.confidence;
        doc.tags = classification.tags.clone();
        doc.extracted_fields = classification.extracted_fields.clone();
        doc.language = extraction.language.clone();
        doc.requires_review = classification.requires_review;
        doc.status = if extraction_failed {
            ProcessingStatus::Failed
        } else {
            ProcessingStatus::Completed
        };

        document::insert_document(conn, &doc)?;
        let version = lineage::record_initial_version(conn, &doc, request.user_id)?;

        tracing::info!(
            document_id = %doc.id,
            doc_type = doc.doc_type.as_str(),
            confidence = doc.confidence,
            similar = similar.len(),
            "Document created"
        );
        Ok(ProcessOutcome::Created {
            document: doc,
            version,
            similar,
        })
    }

    /// The user's active document with these exact bytes, if any.
    pub fn check_exact_duplicate(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        bytes: &[u8],
    ) -> Result<Option<Document>, ProcessorError> {
        let hash = compute_content_hash(bytes);
        Ok(document::get_document_by_hash(conn, user_id, &hash)?)
    }

    /// Near-duplicate candidates for content the caller has not stored yet.
    pub fn find_similar_documents(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        file_name: &str,
        text: &str,
    ) -> Result<Vec<SimilarMatch>, ProcessorError> {
        let file_name = sanitize_file_name(file_name);
        Ok(self.detector.find_similar(conn, user_id, &file_name, text)?)
    }

    /// Version history, newest first.
    pub fn list_versions(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Vec<DocumentVersion>, ProcessorError> {
        self.owned_document(conn, user_id, document_id)?;
        Ok(version::list_versions(conn, document_id)?)
    }

    pub fn restore_version(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        document_id: &Uuid,
        number: i64,
    ) -> Result<DocumentVersion, ProcessorError> {
        self.owned_document(conn, user_id, document_id)?;
        Ok(lineage::restore_version(conn, document_id, number)?)
    }

    pub fn compare_versions(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        document_id: &Uuid,
        from: i64,
        to: i64,
    ) -> Result<VersionComparison, ProcessorError> {
        self.owned_document(conn, user_id, document_id)?;
        Ok(lineage::compare_versions(conn, document_id, from, to)?)
    }

    fn owned_document(
        &self,
        conn: &Connection,
        user_id: &Uuid,
        document_id: &Uuid,
    ) -> Result<Document, ProcessorError> {
        document::get_document(conn, document_id)?
            .filter(|d| d.user_id == *user_id && !d.deleted)
            .ok_or(ProcessorError::DocumentNotFound(*document_id))
    }

    #[allow(clippy::too_many_arguments)]
    fn append_version(
        &self,
        conn: &Connection,
        request: &UploadRequest,
        target: Uuid,
        file_name: &str,
        media_type: &str,
        content_hash: String,
        extraction: &ExtractionResult,
        classification: &crate::pipeline::classify::Classification,
        auto_linked: bool,
    ) -> Result<ProcessOutcome, ProcessorError> {
        let existing = document::get_document(conn, &target)?
            .filter(|d| d.user_id == request.user_id && !d.deleted)
            .ok_or(ProcessorError::LinkTargetNotFound(target))?;
        document::update_status(conn, &existing.id, ProcessingStatus::Processing)?;

        let version = lineage::add_version(
            conn,
            &existing.id,
            NewVersionInput {
                file_name: file_name.to_string(),
                media_type: media_type.to_string(),
                size_bytes: request.bytes.len() as i64,
                content_hash,
                extracted_text: non_empty(&extraction.text),
                extracted_fields: classification.extracted_fields.clone(),
                uploaded_by: request.user_id,
                change_summary: None,
            },
        )?;

        // Reclassify the document from its newest content
        let mut doc = document::get_document(conn, &existing.id)?
            .ok_or(ProcessorError::LinkTargetNotFound(existing.id))?;
        doc.doc_type = classification.doc_type;
        doc.confidence = classification.confidence;
        doc.tags = classification.tags.clone();
        doc.language = extraction.language.clone();
        doc.requires_review = classification.requires_review;
        doc.status = ProcessingStatus::Completed;
        document::update_document(conn, &doc)?;

        tracing::info!(
            document_id = %doc.id,
            version = version.version_number,
            auto_linked,
            "Upload stored as new version"
        );
        Ok(ProcessOutcome::Versioned {
            document: doc,
            version,
            auto_linked,
        })
    }
}

fn empty_extraction() -> ExtractionResult {
    ExtractionResult {
        text: String::new(),
        method: crate::pipeline::extraction::ExtractionMethod::PlainText,
        confidence: 0.0,
        language: "en".to_string(),
        quality_met: false,
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
