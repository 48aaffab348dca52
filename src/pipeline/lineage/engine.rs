//! Version lineage over the append-only `document_versions` log.
//!
//! Invariants the engine maintains: version numbers are dense and start
//! at 1, exactly one version of a document is current, versions are
//! never rewritten. A restore is a flag flip plus a metadata sync on the
//! document row, never a new log entry.

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::field_diff::{compare_fields, FieldDiff};
use super::text_diff::{compare_text, TextSegment};
use super::LineageError;
use crate::db::repository::{document, version};
use crate::models::{Document, DocumentVersion};

/// Payload for appending a version to a document's log
#[derive(Debug, Clone)]
pub struct NewVersionInput {
    pub file_name: String,
    pub media_type: String,
    pub size_bytes: i64,
    pub content_hash: String,
    pub extracted_text: Option<String>,
    pub extracted_fields: serde_json::Map<String, serde_json::Value>,
    pub uploaded_by: Uuid,
    /// Caller-supplied summary; autogenerated from the diff when `None`.
    pub change_summary: Option<String>,
}

/// Full comparison between two versions of a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    pub document_id: Uuid,
    pub from_version: i64,
    pub to_version: i64,
    pub field_diffs: Vec<FieldDiff>,
    pub text_segments: Vec<TextSegment>,
    pub identical: bool,
}

/// Write version 1 for a freshly created document.
pub fn record_initial_version(
    conn: &Connection,
    doc: &Document,
    uploaded_by: Uuid,
) -> Result<DocumentVersion, LineageError> {
    let entry = DocumentVersion {
        id: Uuid::new_v4(),
        document_id: doc.id,
        version_number: 1,
        file_name: doc.file_name.clone(),
        media_type: doc.media_type.clone(),
        size_bytes: doc.size_bytes,
        content_hash: doc.content_hash.clone(),
        extracted_text: doc.extracted_text.clone(),
        extracted_fields: doc.extracted_fields.clone(),
        uploaded_by,
        uploaded_at: Utc::now(),
        parent_version_id: None,
        change_summary: None,
        is_current: true,
    };
    version::insert_version(conn, &entry)?;
    tracing::info!(document_id = %doc.id, "Recorded initial version");
    Ok(entry)
}

/// Append a new version and make it current. The previous current
/// version becomes this one's parent.
pub fn add_version(
    conn: &Connection,
    document_id: &Uuid,
    input: NewVersionInput,
) -> Result<DocumentVersion, LineageError> {
    let mut doc = document::get_document(conn, document_id)?
        .ok_or(LineageError::DocumentNotFound(*document_id))?;
    let parent = version::current_version(conn, document_id)?;
    let number = version::next_version_number(conn, document_id)?;

    let change_summary = match input.change_summary {
        Some(s) => Some(s),
        None => parent.as_ref().map(|p| {
            summarize_changes(
                p.extracted_text.as_deref().unwrap_or(""),
                input.extracted_text.as_deref().unwrap_or(""),
                &p.extracted_fields,
                &input.extracted_fields,
            )
        }),
    };

    let entry = DocumentVersion {
        id: Uuid::new_v4(),
        document_id: *document_id,
        version_number: number,
        file_name: input.file_name.clone(),
        media_type: input.media_type.clone(),
        size_bytes: input.size_bytes,
        content_hash: input.content_hash.clone(),
        extracted_text: input.extracted_text.clone(),
        extracted_fields: input.extracted_fields.clone(),
        uploaded_by: input.uploaded_by,
        uploaded_at: Utc::now(),
        parent_version_id: parent.map(|p| p.id),
        change_summary,
        is_current: false,
    };
    version::insert_version(conn, &entry)?;
    version::mark_current(conn, document_id, &entry.id)?;

    // The document row mirrors its current version's metadata
    doc.file_name = input.file_name;
    doc.media_type = input.media_type;
    doc.size_bytes = input.size_bytes;
    doc.content_hash = input.content_hash;
    doc.extracted_text = input.extracted_text;
    doc.extracted_fields = input.extracted_fields;
    doc.updated_at = Utc::now();
    document::update_document(conn, &doc)?;

    tracing::info!(
        document_id = %document_id,
        version = number,
        "Appended document version"
    );
    Ok(entry)
}

/// Make an older version current again. No new log entry: the flip and
/// the document-row sync are the whole operation.
pub fn restore_version(
    conn: &Connection,
    document_id: &Uuid,
    number: i64,
) -> Result<DocumentVersion, LineageError> {
    let mut doc = document::get_document(conn, document_id)?
        .ok_or(LineageError::DocumentNotFound(*document_id))?;
    let target = find_version(conn, document_id, number)?;

    version::mark_current(conn, document_id, &target.id)?;

    doc.file_name = target.file_name.clone();
    doc.media_type = target.media_type.clone();
    doc.size_bytes = target.size_bytes;
    doc.content_hash = target.content_hash.clone();
    doc.extracted_text = target.extracted_text.clone();
    doc.extracted_fields = target.extracted_fields.clone();
    doc.updated_at = Utc::now();
    document::update_document(conn, &doc)?;

    tracing::info!(
        document_id = %document_id,
        version = number,
        "Restored document version"
    );
    Ok(DocumentVersion {
        is_current: true,
        ..target
    })
}

/// Diff two versions of a document: extracted fields key by key, text as
/// grouped character runs.
pub fn compare_versions(
    conn: &Connection,
    document_id: &Uuid,
    from: i64,
    to: i64,
) -> Result<VersionComparison, LineageError> {
    let from_version = find_version(conn, document_id, from)?;
    let to_version = find_version(conn, document_id, to)?;

    let field_diffs = compare_fields(&from_version.extracted_fields, &to_version.extracted_fields);
    let text_segments = compare_text(
        from_version.extracted_text.as_deref().unwrap_or(""),
        to_version.extracted_text.as_deref().unwrap_or(""),
    );

    let identical = field_diffs.is_empty()
        && text_segments.is_empty()
        && from_version.content_hash == to_version.content_hash;

    Ok(VersionComparison {
        document_id: *document_id,
        from_version: from,
        to_version: to,
        field_diffs,
        text_segments,
        identical,
    })
}

/// Structural check of a document's version log. Catches what bugs or
/// manual database edits would break: gaps in numbering, zero or several
/// current versions, parent pointers leaving the document.
pub fn verify_lineage(conn: &Connection, document_id: &Uuid) -> Result<(), LineageError> {
    let versions = version::list_versions(conn, document_id)?;
    if versions.is_empty() {
        return Err(LineageError::IntegrityViolation {
            document_id: *document_id,
            reason: "document has no versions".into(),
        });
    }

    let mut numbers: Vec<i64> = versions.iter().map(|v| v.version_number).collect();
    numbers.sort_unstable();
    for (i, n) in numbers.iter().enumerate() {
        if *n != (i as i64) + 1 {
            return Err(LineageError::IntegrityViolation {
                document_id: *document_id,
                reason: format!("version numbers not dense: {numbers:?}"),
            });
        }
    }

    let current_count = versions.iter().filter(|v| v.is_current).count();
    if current_count != 1 {
        return Err(LineageError::IntegrityViolation {
            document_id: *document_id,
            reason: format!("{current_count} versions marked current"),
        });
    }

    for v in &versions {
        if let Some(parent_id) = v.parent_version_id {
            let parent = versions.iter().find(|p| p.id == parent_id);
            match parent {
                None => {
                    return Err(LineageError::IntegrityViolation {
                        document_id: *document_id,
                        reason: format!("version {} has a foreign parent", v.version_number),
                    })
                }
                Some(p) if p.version_number >= v.version_number => {
                    return Err(LineageError::IntegrityViolation {
                        document_id: *document_id,
                        reason: format!(
                            "version {} points forward to version {}",
                            v.version_number, p.version_number
                        ),
                    })
                }
                Some(_) => {}
            }
        }
    }

    Ok(())
}

fn find_version(
    conn: &Connection,
    document_id: &Uuid,
    number: i64,
) -> Result<DocumentVersion, LineageError> {
    version::list_versions(conn, document_id)?
        .into_iter()
        .find(|v| v.version_number == number)
        .ok_or(LineageError::VersionNotFound {
            document_id: *document_id,
            number,
        })
}

fn summarize_changes(
    old_text: &str,
    new_text: &str,
    old_fields: &serde_json::Map<String, serde_json::Value>,
    new_fields: &serde_json::Map<String, serde_json::Value>,
) -> String {
    let field_count = compare_fields(old_fields, new_fields).len();
    let text_changed = old_text != new_text;

    match (field_count, text_changed) {
        (0, false) => "no content changes".to_string(),
        (0, true) => "text updated".to_string(),
        (1, false) => "1 field changed".to_string(),
        (n, false) => format!("{n} fields changed"),
        (1, true) => "1 field changed, text updated".to_string(),
        (n, true) => format!("{n} fields changed, text updated"),
    }
}
