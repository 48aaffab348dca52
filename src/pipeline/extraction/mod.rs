pub mod cascade;
pub mod language;
pub mod native;
pub mod ocr;
pub mod preprocess;
pub mod quality;
pub mod types;
pub mod vision;

pub use cascade::*;
pub use native::*;
pub use ocr::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("OCR initialization failed: {0}")]
    OcrInit(String),

    #[error("OCR processing failed: {0}")]
    OcrProcessing(String),

    #[error("OCR timed out after {0}s")]
    OcrTimeout(u64),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Text encoding error: {0}")]
    EncodingError(String),

    #[error("Vision backend error: {0}")]
    Vision(String),

    #[error("Unsupported format for extraction")]
    UnsupportedFormat,

    #[error("All extraction strategies failed: {0}")]
    Exhausted(String),
}
