use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Document, DocumentType, ProcessingStatus};

const DOCUMENT_COLUMNS: &str = "id, user_id, file_name, media_type, size_bytes, content_hash,
     extracted_text, doc_type, confidence, tags, extracted_fields, language,
     requires_review, status, deleted, created_at, updated_at";

pub fn insert_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO documents (id, user_id, file_name, media_type, size_bytes, content_hash,
         extracted_text, doc_type, confidence, tags, extracted_fields, language,
         requires_review, status, deleted, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            doc.id.to_string(),
            doc.user_id.to_string(),
            doc.file_name,
            doc.media_type,
            doc.size_bytes,
            doc.content_hash,
            doc.extracted_text.as_deref().unwrap_or(""),
            doc.doc_type.as_str(),
            doc.confidence,
            serde_json::to_string(&doc.tags)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            serde_json::to_string(&doc.extracted_fields)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            doc.language,
            doc.requires_review as i32,
            doc.status.as_str(),
            doc.deleted as i32,
            doc.created_at.to_rfc3339(),
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id.to_string()], map_document_row);
    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Exact-duplicate lookup: same owner, same content hash, not deleted.
pub fn get_document_by_hash(
    conn: &Connection,
    user_id: &Uuid,
    content_hash: &str,
) -> Result<Option<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE user_id = ?1 AND content_hash = ?2 AND deleted = 0 LIMIT 1"
    ))?;

    let result = stmt.query_row(params![user_id.to_string(), content_hash], map_document_row);
    match result {
        Ok(row) => Ok(Some(document_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// All active documents for a user, newest first. Similarity candidates.
pub fn list_documents(conn: &Connection, user_id: &Uuid) -> Result<Vec<Document>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE user_id = ?1 AND deleted = 0 ORDER BY created_at DESC"
    ))?;

    let rows = stmt.query_map(params![user_id.to_string()], map_document_row)?;
    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

/// Rewrite a document's mutable columns after processing or a version flip.
pub fn update_document(conn: &Connection, doc: &Document) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET file_name = ?2, media_type = ?3, size_bytes = ?4,
         content_hash = ?5, extracted_text = ?6, doc_type = ?7, confidence = ?8,
         tags = ?9, extracted_fields = ?10, language = ?11, requires_review = ?12,
         status = ?13, updated_at = ?14
         WHERE id = ?1",
        params![
            doc.id.to_string(),
            doc.file_name,
            doc.media_type,
            doc.size_bytes,
            doc.content_hash,
            doc.extracted_text.as_deref().unwrap_or(""),
            doc.doc_type.as_str(),
            doc.confidence,
            serde_json::to_string(&doc.tags)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            serde_json::to_string(&doc.extracted_fields)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            doc.language,
            doc.requires_review as i32,
            doc.status.as_str(),
            doc.updated_at.to_rfc3339(),
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: doc.id.to_string(),
        });
    }
    Ok(())
}

pub fn update_status(
    conn: &Connection,
    document_id: &Uuid,
    status: ProcessingStatus,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            document_id.to_string(),
            status.as_str(),
            Utc::now().to_rfc3339()
        ],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: document_id.to_string(),
        });
    }
    Ok(())
}

/// Soft delete: the row and its version log stay, but the document drops
/// out of listings, duplicate checks, and similarity scans.
pub fn soft_delete_document(conn: &Connection, document_id: &Uuid) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE documents SET deleted = 1, updated_at = ?2 WHERE id = ?1 AND deleted = 0",
        params![document_id.to_string(), Utc::now().to_rfc3339()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Document".into(),
            id: document_id.to_string(),
        });
    }
    tracing::info!(document_id = %document_id, "Document soft-deleted");
    Ok(())
}

// Internal row type for Document mapping
struct DocumentRow {
    id: String,
    user_id: String,
    file_name: String,
    media_type: String,
    size_bytes: i64,
    content_hash: String,
    extracted_text: String,
    doc_type: String,
    confidence: f64,
    tags: String,
    extracted_fields: String,
    language: String,
    requires_review: i32,
    status: String,
    deleted: i32,
    created_at: String,
    updated_at: String,
}

fn map_document_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        file_name: row.get(2)?,
        media_type: row.get(3)?,
        size_bytes: row.get(4)?,
        content_hash: row.get(5)?,
        extracted_text: row.get(6)?,
        doc_type: row.get(7)?,
        confidence: row.get(8)?,
        tags: row.get(9)?,
        extracted_fields: row.get(10)?,
        language: row.get(11)?,
        requires_review: row.get(12)?,
        status: row.get(13)?,
        deleted: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow(format!("bad timestamp {raw:?}: {e}")))
}

fn document_from_row(row: DocumentRow) -> Result<Document, DatabaseError> {
    Ok(Document {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        user_id: Uuid::parse_str(&row.user_id)
            .map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        file_name: row.file_name,
        media_type: row.media_type,
        size_bytes: row.size_bytes,
        content_hash: row.content_hash,
        extracted_text: if row.extracted_text.is_empty() {
            None
        } else {
            Some(row.extracted_text)
        },
        doc_type: DocumentType::parse_lenient(&row.doc_type),
        confidence: row.confidence,
        tags: serde_json::from_str(&row.tags)
            .map_err(|e| DatabaseError::CorruptRow(format!("bad tags: {e}")))?,
        extracted_fields: serde_json::from_str(&row.extracted_fields)
            .map_err(|e| DatabaseError::CorruptRow(format!("bad extracted_fields: {e}")))?,
        language: row.language,
        requires_review: row.requires_review != 0,
        status: ProcessingStatus::parse(&row.status).unwrap_or(ProcessingStatus::Pending),
        deleted: row.deleted != 0,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
