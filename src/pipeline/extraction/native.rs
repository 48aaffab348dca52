//! Native PDF text-layer extraction and page rasterization via the
//! poppler command-line tools. Both run as killable subprocesses so a
//! pathological PDF cannot stall the pipeline.

use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use super::types::{PdfPageRenderer, PdfTextExtractor};
use super::ExtractionError;

/// Poll a child process until it exits or the budget runs out.
/// Returns `None` after killing a child that overran.
pub(crate) fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// `pdftotext`-backed text-layer extraction.
pub struct PdftotextCli {
    binary: PathBuf,
    timeout: Duration,
}

impl PdftotextCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("pdftotext"),
            timeout: Duration::from_secs(20),
        }
    }

    pub fn with_binary(mut self, path: PathBuf) -> Self {
        self.binary = path;
        self
    }
}

impl Default for PdftotextCli {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfTextExtractor for PdftotextCli {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let dir = tempfile::tempdir()?;
        let pdf_path = dir.path().join("input.pdf");
        let out_path = dir.path().join("out.txt");
        std::fs::write(&pdf_path, pdf_bytes)?;

        let mut child = Command::new(&self.binary)
            .arg("-layout")
            .arg("-enc")
            .arg("UTF-8")
            .arg(&pdf_path)
            .arg(&out_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExtractionError::PdfParsing(format!("pdftotext spawn: {e}")))?;

        let status = wait_with_timeout(&mut child, self.timeout)?
            .ok_or_else(|| ExtractionError::PdfParsing("pdftotext timed out".into()))?;
        if !status.success() {
            return Err(ExtractionError::PdfParsing(format!(
                "pdftotext exited with {status}"
            )));
        }

        Ok(std::fs::read_to_string(&out_path)?)
    }
}

/// In-process text-layer reader via `lopdf`. Second opinion beside the
/// pdftotext subprocess: the two disagree often enough on layout-heavy
/// documents that running both and keeping the longer output pays off.
pub struct LopdfExtractor;

impl PdfTextExtractor for LopdfExtractor {
    fn extract_text(&self, pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
        let doc = lopdf::Document::load_mem(pdf_bytes)
            .map_err(|e| ExtractionError::PdfParsing(format!("lopdf load: {e}")))?;

        let mut page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        let mut out = String::new();
        for page in page_numbers {
            // Pages without a text layer just contribute nothing
            if let Ok(text) = doc.extract_text(&[page]) {
                let text = text.trim();
                if !text.is_empty() {
                    if !out.is_empty() {
                        out.push_str("\n\n");
                    }
                    out.push_str(text);
                }
            }
        }
        Ok(out)
    }
}

/// `pdftoppm`-backed page rasterization for the OCR fallback.
pub struct PdftoppmCli {
    binary: PathBuf,
    timeout: Duration,
    dpi: u32,
}

impl PdftoppmCli {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("pdftoppm"),
            timeout: Duration::from_secs(30),
            dpi: 300,
        }
    }
}

impl Default for PdftoppmCli {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfPageRenderer for PdftoppmCli {
    fn render_page(&self, pdf_bytes: &[u8], page: u32) -> Result<Vec<u8>, ExtractionError> {
        let dir = tempfile::tempdir()?;
        let pdf_path = dir.path().join("input.pdf");
        std::fs::write(&pdf_path, pdf_bytes)?;

        let mut child = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg(&pdf_path)
            .arg(dir.path().join("page"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExtractionError::PdfParsing(format!("pdftoppm spawn: {e}")))?;

        let status = wait_with_timeout(&mut child, self.timeout)?
            .ok_or_else(|| ExtractionError::PdfParsing("pdftoppm timed out".into()))?;
        if !status.success() {
            return Err(ExtractionError::PdfParsing(format!(
                "pdftoppm exited with {status}"
            )));
        }

        // pdftoppm pads the page suffix by document length, so scan for
        // the single PNG it produced instead of guessing the name.
        for entry in std::fs::read_dir(dir.path())? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "png") {
                return Ok(std::fs::read(&path)?);
            }
        }
        Err(ExtractionError::PdfParsing(format!(
            "pdftoppm produced no output for page {page}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_kills_runaway_child() {
        let mut child = Command::new("sleep")
            .arg("5")
            .stdout(Stdio::null())
            .spawn()
            .unwrap();
        let status = wait_with_timeout(&mut child, Duration::from_millis(100)).unwrap();
        assert!(status.is_none());
    }

    #[test]
    fn fast_child_returns_status() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_with_timeout(&mut child, Duration::from_secs(5)).unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn lopdf_rejects_garbage_bytes() {
        assert!(matches!(
            LopdfExtractor.extract_text(b"%PDF-1.4 but not really"),
            Err(ExtractionError::PdfParsing(_))
        ));
    }

    #[test]
    fn missing_binary_maps_to_pdf_parsing() {
        let cli = PdftotextCli::new().with_binary(PathBuf::from("/nonexistent/pdftotext"));
        assert!(matches!(
            cli.extract_text(b"%PDF-1.4"),
            Err(ExtractionError::PdfParsing(_))
        ));
    }
}
