use super::language::detect_language;
use super::native::{LopdfExtractor, PdftoppmCli, PdftotextCli};
use super::ocr::TesseractCli;
use super::preprocess::preprocess_image;
use super::quality::{is_usable, sanitize_text, substantive_chars};
use super::types::{
    ExtractionMethod, ExtractionResult, OcrEngine, OcrMode, OcrOutput, PdfPageRenderer,
    PdfTextExtractor, VisionClient,
};
use super::vision::HttpVisionClient;
use super::ExtractionError;
use crate::config::PipelineConfig;
use crate::pipeline::intake::FileCategory;

/// Strategy cascade for pulling text out of an upload.
///
/// Each rung runs only when the previous one failed or produced text
/// below the usability bar: PDFs try the native text layer, then OCR on
/// rasterized pages, then the vision model; images skip straight to OCR.
/// Engines are trait objects so tests inject scripted ones.
pub struct ExtractionCascade {
    pdf_extractor: Box<dyn PdfTextExtractor + Send + Sync>,
    /// Second native reader; when present, both run and the longer
    /// output wins before the usability check.
    pdf_second_opinion: Option<Box<dyn PdfTextExtractor + Send + Sync>>,
    pdf_renderer: Option<Box<dyn PdfPageRenderer + Send + Sync>>,
    ocr_engine: Option<Box<dyn OcrEngine + Send + Sync>>,
    vision_client: Option<Box<dyn VisionClient + Send + Sync>>,
    min_chars: usize,
    ocr_retry_chars: usize,
    ocr_min_confidence: f32,
    ocr_max_pages: u32,
}

impl ExtractionCascade {
    pub fn new(config: &PipelineConfig, pdf_extractor: Box<dyn PdfTextExtractor + Send + Sync>) -> Self {
        Self {
            pdf_extractor,
            pdf_second_opinion: None,
            pdf_renderer: None,
            ocr_engine: None,
            vision_client: None,
            min_chars: config.min_extraction_chars,
            ocr_retry_chars: config.ocr_retry_chars,
            ocr_min_confidence: config.ocr_min_confidence,
            ocr_max_pages: config.ocr_max_pages,
        }
    }

    /// Cascade wired to the poppler and tesseract command-line tools,
    /// plus the vision fallback when the config names a model for it.
    pub fn with_defaults(config: &PipelineConfig) -> Self {
        let mut cascade = Self::new(config, Box::new(PdftotextCli::new()))
            .with_pdf_second_opinion(Box::new(LopdfExtractor))
            .with_pdf_renderer(Box::new(PdftoppmCli::new()))
            .with_ocr_engine(Box::new(TesseractCli::new(config.ocr_mode_timeout_secs)));

        if let (Some(endpoint), Some(model)) = (&config.ai_endpoint, &config.vision_model) {
            match HttpVisionClient::new(endpoint, model, config.ai_timeout_secs) {
                Ok(client) => cascade = cascade.with_vision_client(Box::new(client)),
                Err(e) => {
                    tracing::warn!(error = %e, "Vision client unavailable, cascade ends at OCR")
                }
            }
        }
        cascade
    }

    pub fn with_pdf_second_opinion(
        mut self,
        extractor: Box<dyn PdfTextExtractor + Send + Sync>,
    ) -> Self {
        self.pdf_second_opinion = Some(extractor);
        self
    }

    pub fn with_pdf_renderer(mut self, renderer: Box<dyn PdfPageRenderer + Send + Sync>) -> Self {
        self.pdf_renderer = Some(renderer);
        self
    }

    pub fn with_ocr_engine(mut self, engine: Box<dyn OcrEngine + Send + Sync>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    pub fn with_vision_client(mut self, client: Box<dyn VisionClient + Send + Sync>) -> Self {
        self.vision_client = Some(client);
        self
    }

    /// Run the cascade. Returns the first usable extraction; when no rung
    /// clears the bar, the richest attempt comes back with its confidence
    /// floored so the caller flags the document for review.
    pub fn extract(
        &self,
        category: FileCategory,
        bytes: &[u8],
    ) -> Result<ExtractionResult, ExtractionError> {
        match category {
            FileCategory::PlainText => self.extract_plain_text(bytes),
            FileCategory::Pdf => self.extract_pdf(bytes),
            FileCategory::Image => self.extract_image(bytes),
            FileCategory::Unsupported => Err(ExtractionError::UnsupportedFormat),
        }
    }

    fn extract_plain_text(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ExtractionError::EncodingError(e.to_string()))?;
        let text = sanitize_text(text);
        let language = detect_language(&text);
        let quality_met = is_usable(&text, self.min_chars);
        Ok(ExtractionResult {
            text,
            method: ExtractionMethod::PlainText,
            confidence: 0.99,
            language,
            quality_met,
        })
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let mut best: Option<(String, ExtractionMethod, f32)> = None;
        let mut failures: Vec<String> = Vec::new();

        // Rung 1: native text layer, both readers, longer output wins
        if let Some(raw) = self.native_text(bytes, &mut failures) {
            let text = sanitize_text(&raw);
            if is_usable(&text, self.min_chars) {
                return Ok(self.finish(text, ExtractionMethod::PdfNative, 0.95));
            }
            tracing::debug!(
                chars = substantive_chars(&text),
                "Native PDF text below usability bar, falling back to OCR"
            );
            keep_best(&mut best, text, ExtractionMethod::PdfNative, 0.95);
        }

        // Rungs 2 and 3 need a rasterized page
        let page_images = self.render_pages(bytes, &mut failures);
        for image in &page_images {
            match self.run_ocr(image) {
                Ok(out) => {
                    let text = sanitize_text(&out.text);
                    if is_usable(&text, self.min_chars) && out.confidence >= self.ocr_min_confidence
                    {
                        return Ok(self.finish(text, ExtractionMethod::Ocr, out.confidence));
                    }
                    keep_best(&mut best, text, ExtractionMethod::Ocr, out.confidence);
                }
                Err(e) => failures.push(format!("ocr: {e}")),
            }
        }

        if let Some(first_page) = page_images.first() {
            match self.run_vision(first_page) {
                Ok(Some(text)) => {
                    if self.vision_beats(&text, &best) {
                        return Ok(self.finish(text, ExtractionMethod::Vision, 0.7));
                    }
                    keep_best(&mut best, text, ExtractionMethod::Vision, 0.7);
                }
                Ok(None) => {}
                Err(e) => failures.push(format!("vision: {e}")),
            }
        }

        self.settle(best, failures)
    }

    fn extract_image(&self, bytes: &[u8]) -> Result<ExtractionResult, ExtractionError> {
        let mut best: Option<(String, ExtractionMethod, f32)> = None;
        let mut failures: Vec<String> = Vec::new();

        let prepared = match preprocess_image(bytes) {
            Ok(p) => p,
            Err(e) => {
                failures.push(format!("preprocess: {e}"));
                bytes.to_vec()
            }
        };

        match self.run_ocr(&prepared) {
            Ok(out) => {
                let text = sanitize_text(&out.text);
                if is_usable(&text, self.min_chars) && out.confidence >= self.ocr_min_confidence {
                    return Ok(self.finish(text, ExtractionMethod::Ocr, out.confidence));
                }
                keep_best(&mut best, text, ExtractionMethod::Ocr, out.confidence);
            }
            Err(e) => failures.push(format!("ocr: {e}")),
        }

        match self.run_vision(&prepared) {
            Ok(Some(text)) => {
                if self.vision_beats(&text, &best) {
                    return Ok(self.finish(text, ExtractionMethod::Vision, 0.7));
                }
                keep_best(&mut best, text, ExtractionMethod::Vision, 0.7);
            }
            Ok(None) => {}
            Err(e) => failures.push(format!("vision: {e}")),
        }

        self.settle(best, failures)
    }

    /// One OCR pass in block mode, retried in sparse-text mode when the
    /// first pass came back thin or low-confidence. The better of the two
    /// attempts wins on substantive characters, then confidence.
    fn run_ocr(&self, image: &[u8]) -> Result<OcrOutput, ExtractionError> {
        let engine = self
            .ocr_engine
            .as_ref()
            .ok_or_else(|| ExtractionError::OcrInit("no OCR engine configured".into()))?;

        let first = engine.ocr_image(image, OcrMode::Block)?;
        let needs_retry = substantive_chars(&first.text) < self.ocr_retry_chars
            || first.confidence < self.ocr_min_confidence;
        if !needs_retry {
            return Ok(first);
        }

        tracing::debug!(
            chars = substantive_chars(&first.text),
            confidence = first.confidence,
            "Retrying OCR in sparse-text mode"
        );
        match engine.ocr_image(image, OcrMode::SparseText) {
            Ok(second) => {
                let first_chars = substantive_chars(&first.text);
                let second_chars = substantive_chars(&second.text);
                if second_chars > first_chars
                    || (second_chars == first_chars && second.confidence > first.confidence)
                {
                    Ok(second)
                } else {
                    Ok(first)
                }
            }
            // Retry failure keeps the first attempt
            Err(_) => Ok(first),
        }
    }

    /// Runs both native readers when a second opinion is configured and
    /// keeps the longer raw output.
    fn native_text(&self, bytes: &[u8], failures: &mut Vec<String>) -> Option<String> {
        let mut out: Option<String> = None;
        match self.pdf_extractor.extract_text(bytes) {
            Ok(raw) => out = Some(raw),
            Err(e) => {
                tracing::warn!(error = %e, "Native PDF extraction failed");
                failures.push(format!("pdf_native: {e}"));
            }
        }
        if let Some(second) = self.pdf_second_opinion.as_ref() {
            match second.extract_text(bytes) {
                Ok(raw) => {
                    let longer = match &out {
                        Some(existing) => substantive_chars(&raw) > substantive_chars(existing),
                        None => true,
                    };
                    if longer {
                        out = Some(raw);
                    }
                }
                Err(e) => failures.push(format!("pdf_parser: {e}")),
            }
        }
        out
    }

    fn run_vision(&self, image: &[u8]) -> Result<Option<String>, ExtractionError> {
        let Some(client) = self.vision_client.as_ref() else {
            return Ok(None);
        };
        let raw = client.read_image(image)?;
        Ok(Some(sanitize_text(&raw)))
    }

    /// Vision replaces an earlier attempt only when its text clears the
    /// usability bar and is at least as long as what that attempt kept.
    fn vision_beats(&self, text: &str, best: &Option<(String, ExtractionMethod, f32)>) -> bool {
        let best_chars = best
            .as_ref()
            .map(|(t, _, _)| substantive_chars(t))
            .unwrap_or(0);
        is_usable(text, self.min_chars) && substantive_chars(text) >= best_chars
    }

    fn render_pages(&self, bytes: &[u8], failures: &mut Vec<String>) -> Vec<Vec<u8>> {
        let Some(renderer) = self.pdf_renderer.as_ref() else {
            return Vec::new();
        };
        let mut images = Vec::new();
        for page in 1..=self.ocr_max_pages {
            match renderer.render_page(bytes, page) {
                Ok(raw) => match preprocess_image(&raw) {
                    Ok(prepared) => images.push(prepared),
                    Err(_) => images.push(raw),
                },
                Err(e) => {
                    failures.push(format!("render page {page}: {e}"));
                    break;
                }
            }
        }
        images
    }

    fn finish(&self, text: String, method: ExtractionMethod, confidence: f32) -> ExtractionResult {
        let language = detect_language(&text);
        tracing::info!(
            method = method.as_str(),
            chars = substantive_chars(&text),
            confidence,
            language = %language,
            "Extraction complete"
        );
        ExtractionResult {
            text,
            method,
            confidence,
            language,
            quality_met: true,
        }
    }

    /// No rung cleared the bar. Keep whatever text the best attempt
    /// produced, confidence floored at 0.3 so review is forced upstream.
    fn settle(
        &self,
        best: Option<(String, ExtractionMethod, f32)>,
        failures: Vec<String>,
    ) -> Result<ExtractionResult, ExtractionError> {
        match best {
            Some((text, method, confidence)) if !text.is_empty() => {
                tracing::warn!(
                    method = method.as_str(),
                    chars = substantive_chars(&text),
                    "No extraction cleared the usability bar, keeping best attempt"
                );
                Ok(ExtractionResult {
                    quality_met: false,
                    ..self.finish(text, method, confidence.min(0.3))
                })
            }
            _ => Err(ExtractionError::Exhausted(failures.join("; "))),
        }
    }
}

fn keep_best(
    best: &mut Option<(String, ExtractionMethod, f32)>,
    text: String,
    method: ExtractionMethod,
    confidence: f32,
) {
    let better = match best {
        Some((existing, _, _)) => substantive_chars(&text) > substantive_chars(existing),
        None => true,
    };
    if better {
        *best = Some((text, method, confidence));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct MockPdf {
        result: Result<String, String>,
    }

    impl PdfTextExtractor for MockPdf {
        fn extract_text(&self, _pdf_bytes: &[u8]) -> Result<String, ExtractionError> {
            match &self.result {
                Ok(t) => Ok(t.clone()),
                Err(e) => Err(ExtractionError::PdfParsing(e.clone())),
            }
        }
    }

    struct MockRenderer;

    impl PdfPageRenderer for MockRenderer {
        fn render_page(&self, _pdf_bytes: &[u8], _page: u32) -> Result<Vec<u8>, ExtractionError> {
            // Not a decodable image; the cascade falls back to raw bytes
            Ok(vec![1, 2, 3])
        }
    }

    struct MockOcr {
        block: OcrOutput,
        sparse: OcrOutput,
        calls: Mutex<Vec<OcrMode>>,
    }

    impl MockOcr {
        fn new(block: (&str, f32), sparse: (&str, f32)) -> Self {
            Self {
                block: OcrOutput {
                    text: block.0.to_string(),
                    confidence: block.1,
                },
                sparse: OcrOutput {
                    text: sparse.0.to_string(),
                    confidence: sparse.1,
                },
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl OcrEngine for MockOcr {
        fn ocr_image(&self, _image: &[u8], mode: OcrMode) -> Result<OcrOutput, ExtractionError> {
            self.calls.lock().unwrap().push(mode);
            Ok(match mode {
                OcrMode::Block => self.block.clone(),
                OcrMode::SparseText => self.sparse.clone(),
            })
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default()
    }

    fn long_text(prefix: &str) -> String {
        format!("{prefix} {}", "word ".repeat(60))
    }

    #[test]
    fn usable_native_text_stops_the_cascade() {
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Ok(long_text("Rental agreement for the flat in Berlin")),
            }),
        );
        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfNative);
        assert!(result.confidence > 0.9);
        assert!(result.quality_met);
    }

    #[test]
    fn longer_native_reading_wins() {
        let short = long_text("lease first page");
        let long = format!("{short} plus the annex the first reader dropped");
        let cascade = ExtractionCascade::new(&config(), Box::new(MockPdf { result: Ok(short) }))
            .with_pdf_second_opinion(Box::new(MockPdf {
                result: Ok(long.clone()),
            }));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfNative);
        assert!(result.text.contains("annex the first reader dropped"));
    }

    #[test]
    fn failed_primary_reader_still_uses_second_opinion() {
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("pdftotext missing".into()),
            }),
        )
        .with_pdf_second_opinion(Box::new(MockPdf {
            result: Ok(long_text("parser recovered the deed text")),
        }));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfNative);
        assert!(result.text.contains("parser recovered"));
    }

    #[test]
    fn thin_native_text_falls_through_to_ocr() {
        let ocr = MockOcr::new((&long_text("OCR recovered this lease text"), 0.88), ("", 0.0));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Ok("p. 2".to_string()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
    }

    #[test]
    fn low_confidence_ocr_retries_sparse_mode() {
        let good = long_text("sparse mode found the scattered stamp text");
        let ocr = MockOcr::new(("fragment", 0.2), (&good, 0.8));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("no text layer".into()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert!((result.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn vision_rescues_hopeless_ocr() {
        use crate::pipeline::extraction::vision::MockVisionClient;

        let ocr = MockOcr::new(("", 0.0), ("", 0.0));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("no text layer".into()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr))
        .with_vision_client(Box::new(MockVisionClient {
            response: Ok(long_text("handwritten registration form contents")),
        }));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::Vision);
    }

    #[test]
    fn shorter_vision_text_does_not_displace_richer_ocr() {
        use crate::pipeline::extraction::vision::MockVisionClient;

        let rich = long_text("low confidence but complete lease text");
        let ocr = MockOcr::new((&rich, 0.2), (&rich, 0.2));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("no text layer".into()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr))
        .with_vision_client(Box::new(MockVisionClient {
            response: Ok("snippet ".repeat(10)),
        }));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert!(result.text.contains("complete lease text"));
        assert!(result.confidence <= 0.3);
    }

    #[test]
    fn total_failure_is_exhausted() {
        let ocr = MockOcr::new(("", 0.0), ("", 0.0));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("encrypted".into()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr));

        let err = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap_err();
        assert!(matches!(err, ExtractionError::Exhausted(_)));
    }

    #[test]
    fn below_bar_text_survives_with_floored_confidence() {
        let ocr = MockOcr::new(("short scrap of text", 0.9), ("", 0.0));
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("no text layer".into()),
            }),
        )
        .with_pdf_renderer(Box::new(MockRenderer))
        .with_ocr_engine(Box::new(ocr));

        let result = cascade.extract(FileCategory::Pdf, b"%PDF").unwrap();
        assert_eq!(result.text, "short scrap of text");
        assert!(result.confidence <= 0.3);
        assert!(!result.quality_met);
    }

    #[test]
    fn plain_text_read_directly() {
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("unused".into()),
            }),
        );
        let result = cascade
            .extract(FileCategory::PlainText, "just a note".as_bytes())
            .unwrap();
        assert_eq!(result.method, ExtractionMethod::PlainText);
        assert_eq!(result.text, "just a note");
        // below the usability bar even though the read itself worked
        assert!(!result.quality_met);
    }

    #[test]
    fn unsupported_category_errors() {
        let cascade = ExtractionCascade::new(
            &config(),
            Box::new(MockPdf {
                result: Err("unused".into()),
            }),
        );
        assert!(matches!(
            cascade.extract(FileCategory::Unsupported, b"blob"),
            Err(ExtractionError::UnsupportedFormat)
        ));
    }
}
