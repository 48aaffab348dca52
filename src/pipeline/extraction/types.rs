use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// How text was pulled out of an upload
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PdfNative,
    Ocr,
    Vision,
    PlainText,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PdfNative => "pdf_native",
            Self::Ocr => "ocr",
            Self::Vision => "vision",
            Self::PlainText => "plain_text",
        }
    }
}

/// Result of the extraction cascade for one upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub text: String,
    pub method: ExtractionMethod,
    pub confidence: f32,
    /// ISO 639-1 code, "en" when detection is inconclusive
    pub language: String,
    /// Whether the winning strategy cleared the usability bar. False
    /// means the text is a below-bar scrap kept for lack of anything
    /// better; callers must route the document to review.
    pub quality_met: bool,
}

/// Tesseract page-segmentation mode used for an OCR attempt.
/// `Block` assumes a uniform block of text; `SparseText` finds text
/// scattered over the page and is the retry mode for poor first passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrMode {
    Block,
    SparseText,
}

impl OcrMode {
    pub fn psm(&self) -> u32 {
        match self {
            Self::Block => 6,
            Self::SparseText => 11,
        }
    }
}

/// Raw OCR output for one image
#[derive(Debug, Clone)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    fn ocr_image(&self, image_bytes: &[u8], mode: OcrMode) -> Result<OcrOutput, ExtractionError>;
}

/// Native PDF text-layer extraction
pub trait PdfTextExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// Rasterizes one PDF page to a PNG for OCR
pub trait PdfPageRenderer {
    fn render_page(&self, pdf_bytes: &[u8], page: u32) -> Result<Vec<u8>, ExtractionError>;
}

/// Multimodal model that reads text straight off an image. Last resort
/// of the cascade; only consulted when OCR came back unusable.
pub trait VisionClient {
    fn read_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError>;
}
