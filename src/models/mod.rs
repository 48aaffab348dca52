pub mod document;
pub mod enums;

pub use document::{Document, DocumentVersion};
pub use enums::{DocumentType, ProcessingStatus};
