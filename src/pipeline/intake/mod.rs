pub mod format;
pub mod hash;

pub use format::*;
pub use hash::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: i64 },

    #[error("Empty upload")]
    EmptyUpload,
}
