pub mod engine;
pub mod field_diff;
pub mod text_diff;

pub use engine::*;
pub use field_diff::*;
pub use text_diff::*;

use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Version {number} not found for document {document_id}")]
    VersionNotFound { document_id: Uuid, number: i64 },

    #[error("Version log integrity violated for document {document_id}: {reason}")]
    IntegrityViolation { document_id: Uuid, reason: String },
}
