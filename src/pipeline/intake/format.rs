use serde::{Deserialize, Serialize};

use super::IntakeError;

/// Broad file categories the pipeline handles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileCategory {
    Pdf,
    Image,
    PlainText,
    Unsupported,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::PlainText => "plain_text",
            Self::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Result of format detection on an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatDetection {
    pub media_type: String,
    pub category: FileCategory,
    pub size_bytes: i64,
}

/// Detect upload format from magic bytes (NOT the file extension).
/// Magic bytes don't lie; extensions and client-sent MIME types can be wrong.
/// The file name only breaks ties for plain text.
pub fn detect_format(file_name: &str, bytes: &[u8]) -> Result<FormatDetection, IntakeError> {
    if bytes.is_empty() {
        return Err(IntakeError::EmptyUpload);
    }

    let (media_type, category) = match bytes {
        [0x25, 0x50, 0x44, 0x46, ..] => ("application/pdf".to_string(), FileCategory::Pdf),
        [0xFF, 0xD8, 0xFF, ..] => ("image/jpeg".to_string(), FileCategory::Image),
        [0x89, 0x50, 0x4E, 0x47, ..] => ("image/png".to_string(), FileCategory::Image),
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            ("image/tiff".to_string(), FileCategory::Image)
        }
        _ if is_likely_text(bytes) => {
            // Trust a guessable text-ish extension for the concrete subtype
            let guessed = mime_guess::from_path(file_name).first_or_text_plain();
            let media_type = if guessed.type_() == "text" {
                guessed.essence_str().to_string()
            } else {
                "text/plain".to_string()
            };
            (media_type, FileCategory::PlainText)
        }
        _ => ("application/octet-stream".to_string(), FileCategory::Unsupported),
    };

    Ok(FormatDetection {
        media_type,
        category,
        size_bytes: bytes.len() as i64,
    })
}

/// UTF-8 check on the first chunk, rejecting NUL-heavy binary data.
fn is_likely_text(bytes: &[u8]) -> bool {
    let sample = &bytes[..bytes.len().min(4096)];
    if sample.contains(&0) {
        return false;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => true,
        // A multi-byte char may straddle the sample boundary
        Err(e) => e.valid_up_to() + 4 >= sample.len(),
    }
}

/// Strip path components and shell-hostile characters from a client-supplied
/// file name. Falls back to "upload" when nothing printable survives.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ' | '(' | ')'))
        .collect();
    let trimmed = cleaned.trim().trim_start_matches('.').to_string();
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_magic_bytes_detected() {
        let det = detect_format("contract.pdf", b"%PDF-1.7 rest of file").unwrap();
        assert_eq!(det.category, FileCategory::Pdf);
        assert_eq!(det.media_type, "application/pdf");
    }

    #[test]
    fn jpeg_detected_despite_wrong_extension() {
        let det = detect_format("scan.pdf", &[0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02]).unwrap();
        assert_eq!(det.category, FileCategory::Image);
        assert_eq!(det.media_type, "image/jpeg");
    }

    #[test]
    fn utf8_content_is_plain_text() {
        let det = detect_format("notes.txt", "Mietvertrag für Wohnung".as_bytes()).unwrap();
        assert_eq!(det.category, FileCategory::PlainText);
    }

    #[test]
    fn binary_blob_unsupported() {
        let det = detect_format("blob.bin", &[0x00, 0x01, 0x02, 0xFE, 0x00]).unwrap();
        assert_eq!(det.category, FileCategory::Unsupported);
        assert!(!det.category.is_supported());
    }

    #[test]
    fn empty_upload_rejected() {
        assert!(matches!(
            detect_format("empty.pdf", b""),
            Err(IntakeError::EmptyUpload)
        ));
    }

    #[test]
    fn file_name_sanitization() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\lease v2.pdf"), "lease v2.pdf");
        assert_eq!(sanitize_file_name("rés;umé?.pdf"), "résumé.pdf");
        assert_eq!(sanitize_file_name("...."), "upload");
    }
}
