use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::DocumentVersion;

const VERSION_COLUMNS: &str = "id, document_id, version_number, file_name, media_type, size_bytes,
     content_hash, extracted_text, extracted_fields, uploaded_by, uploaded_at,
     parent_version_id, change_summary, is_current";

pub fn insert_version(conn: &Connection, version: &DocumentVersion) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO document_versions (id, document_id, version_number, file_name, media_type,
         size_bytes, content_hash, extracted_text, extracted_fields, uploaded_by, uploaded_at,
         parent_version_id, change_summary, is_current)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            version.id.to_string(),
            version.document_id.to_string(),
            version.version_number,
            version.file_name,
            version.media_type,
            version.size_bytes,
            version.content_hash,
            version.extracted_text.as_deref().unwrap_or(""),
            serde_json::to_string(&version.extracted_fields)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            version.uploaded_by.to_string(),
            version.uploaded_at.to_rfc3339(),
            version.parent_version_id.map(|id| id.to_string()),
            version.change_summary,
            version.is_current as i32,
        ],
    )?;
    Ok(())
}

/// Full version log for a document, newest first.
pub fn list_versions(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Vec<DocumentVersion>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VERSION_COLUMNS} FROM document_versions
         WHERE document_id = ?1 ORDER BY version_number DESC"
    ))?;
    let rows = stmt.query_map(params![document_id.to_string()], map_version_row)?;
    let mut versions = Vec::new();
    for row in rows {
        versions.push(version_from_row(row?)?);
    }
    Ok(versions)
}

pub fn current_version(
    conn: &Connection,
    document_id: &Uuid,
) -> Result<Option<DocumentVersion>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {VERSION_COLUMNS} FROM document_versions
         WHERE document_id = ?1 AND is_current = 1 LIMIT 1"
    ))?;
    let result = stmt.query_row(params![document_id.to_string()], map_version_row);
    match result {
        Ok(row) => Ok(Some(version_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Next free version number for a document (1 for the first version).
pub fn next_version_number(conn: &Connection, document_id: &Uuid) -> Result<i64, DatabaseError> {
    let max: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version_number), 0) FROM document_versions WHERE document_id = ?1",
            params![document_id.to_string()],
            |row| row.get(0),
        )?;
    Ok(max + 1)
}

/// Flip the current flag to the given version, atomically. Exactly one
/// version of a document is current afterwards.
pub fn mark_current(
    conn: &Connection,
    document_id: &Uuid,
    version_id: &Uuid,
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "UPDATE document_versions SET is_current = 0 WHERE document_id = ?1",
        params![document_id.to_string()],
    )?;
    let rows = tx.execute(
        "UPDATE document_versions SET is_current = 1 WHERE id = ?1 AND document_id = ?2",
        params![version_id.to_string(), document_id.to_string()],
    )?;
    if rows == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "DocumentVersion".into(),
            id: version_id.to_string(),
        });
    }
    tx.commit()?;
    Ok(())
}

struct VersionRow {
    id: String,
    document_id: String,
    version_number: i64,
    file_name: String,
    media_type: String,
    size_bytes: i64,
    content_hash: String,
    extracted_text: String,
    extracted_fields: String,
    uploaded_by: String,
    uploaded_at: String,
    parent_version_id: Option<String>,
    change_summary: Option<String>,
    is_current: i32,
}

fn map_version_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionRow> {
    Ok(VersionRow {
        id: row.get(0)?,
        document_id: row.get(1)?,
        version_number: row.get(2)?,
        file_name: row.get(3)?,
        media_type: row.get(4)?,
        size_bytes: row.get(5)?,
        content_hash: row.get(6)?,
        extracted_text: row.get(7)?,
        extracted_fields: row.get(8)?,
        uploaded_by: row.get(9)?,
        uploaded_at: row.get(10)?,
        parent_version_id: row.get(11)?,
        change_summary: row.get(12)?,
        is_current: row.get(13)?,
    })
}

fn version_from_row(row: VersionRow) -> Result<DocumentVersion, DatabaseError> {
    Ok(DocumentVersion {
        id: Uuid::parse_str(&row.id).map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        document_id: Uuid::parse_str(&row.document_id)
            .map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        version_number: row.version_number,
        file_name: row.file_name,
        media_type: row.media_type,
        size_bytes: row.size_bytes,
        content_hash: row.content_hash,
        extracted_text: if row.extracted_text.is_empty() {
            None
        } else {
            Some(row.extracted_text)
        },
        extracted_fields: serde_json::from_str(&row.extracted_fields)
            .map_err(|e| DatabaseError::CorruptRow(format!("bad extracted_fields: {e}")))?,
        uploaded_by: Uuid::parse_str(&row.uploaded_by)
            .map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        uploaded_at: DateTime::parse_from_rfc3339(&row.uploaded_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DatabaseError::CorruptRow(format!("bad timestamp: {e}")))?,
        parent_version_id: row
            .parent_version_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| DatabaseError::CorruptRow(e.to_string()))?,
        change_summary: row.change_summary,
        is_current: row.is_current != 0,
    })
}
