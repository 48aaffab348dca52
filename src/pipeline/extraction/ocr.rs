use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use super::native::wait_with_timeout;
use super::types::{OcrEngine, OcrMode, OcrOutput};
use super::ExtractionError;

/// Tesseract driven as a subprocess. The default engine: no build-time
/// linkage, and a wedged recognizer gets killed at the timeout instead
/// of hanging the pipeline.
pub struct TesseractCli {
    binary: PathBuf,
    languages: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            languages: "eng+deu+fra".to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_languages(mut self, langs: &str) -> Self {
        self.languages = langs.to_string();
        self
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8], mode: OcrMode) -> Result<OcrOutput, ExtractionError> {
        let dir = tempfile::tempdir()?;
        let img_path = dir.path().join("input.png");
        std::fs::write(&img_path, image_bytes)?;
        let out_base = dir.path().join("out");

        let mut child = Command::new(&self.binary)
            .arg(&img_path)
            .arg(&out_base)
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(mode.psm().to_string())
            .arg("tsv")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ExtractionError::OcrInit(format!("tesseract spawn: {e}")))?;

        let status = wait_with_timeout(&mut child, self.timeout)?
            .ok_or(ExtractionError::OcrTimeout(self.timeout.as_secs()))?;
        if !status.success() {
            return Err(ExtractionError::OcrProcessing(format!(
                "tesseract exited with {status}"
            )));
        }

        let tsv = std::fs::read_to_string(out_base.with_extension("tsv"))?;
        Ok(parse_tsv(&tsv))
    }
}

/// Rebuild text and mean word confidence from Tesseract TSV output.
/// Columns: level page block par line word left top width height conf text.
/// Level 5 rows are words; conf -1 marks non-word structural rows.
fn parse_tsv(tsv: &str) -> OcrOutput {
    let mut text = String::new();
    let mut conf_sum = 0.0f32;
    let mut conf_count = 0u32;
    let mut last_line_key = (0u32, 0u32, 0u32);

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let word = cols[11].trim();
        if conf < 0.0 || word.is_empty() {
            continue;
        }

        let line_key = (
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        );
        if !text.is_empty() {
            text.push(if line_key == last_line_key { ' ' } else { '\n' });
        }
        last_line_key = line_key;

        text.push_str(word);
        conf_sum += conf;
        conf_count += 1;
    }

    let confidence = if conf_count > 0 {
        (conf_sum / conf_count as f32) / 100.0
    } else {
        0.0
    };
    OcrOutput { text, confidence }
}

/// In-process Tesseract via the `tesseract` crate.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: std::path::PathBuf,
    languages: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    pub fn new(tessdata_dir: &std::path::Path) -> Result<Self, ExtractionError> {
        if !tessdata_dir.join("eng.traineddata").exists() {
            return Err(ExtractionError::OcrInit(format!(
                "tessdata not found at {}",
                tessdata_dir.display()
            )));
        }
        let has_deu = tessdata_dir.join("deu.traineddata").exists();
        let has_fra = tessdata_dir.join("fra.traineddata").exists();
        let languages = match (has_deu, has_fra) {
            (true, true) => "eng+deu+fra".to_string(),
            (true, false) => "eng+deu".to_string(),
            (false, true) => "eng+fra".to_string(),
            (false, false) => {
                tracing::warn!(
                    "Only English traineddata found at {}",
                    tessdata_dir.display()
                );
                "eng".to_string()
            }
        };
        Ok(Self {
            tessdata_dir: tessdata_dir.to_path_buf(),
            languages,
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8], mode: OcrMode) -> Result<OcrOutput, ExtractionError> {
        let tessdata = self
            .tessdata_dir
            .to_str()
            .ok_or_else(|| ExtractionError::OcrInit("invalid tessdata path".into()))?;

        let tess = tesseract::Tesseract::new(Some(tessdata), Some(&self.languages))
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;
        let tess = tess
            .set_variable("tessedit_pageseg_mode", &mode.psm().to_string())
            .map_err(|e| ExtractionError::OcrInit(format!("{e:?}")))?;
        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| ExtractionError::OcrProcessing(format!("{e:?}")))?;
        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrOutput { text, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tsv_parsing_rebuilds_lines_and_confidence() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t95\tRental\n\
                   5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t85\tAgreement\n\
                   5\t1\t1\t1\t2\t1\t0\t12\t10\t10\t90\tBerlin\n";
        let out = parse_tsv(tsv);
        assert_eq!(out.text, "Rental Agreement\nBerlin");
        assert!((out.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn empty_tsv_yields_zero_confidence() {
        let out = parse_tsv("level\tpage\n");
        assert_eq!(out.text, "");
        assert_eq!(out.confidence, 0.0);
    }

    #[test]
    fn psm_values_match_modes() {
        assert_eq!(OcrMode::Block.psm(), 6);
        assert_eq!(OcrMode::SparseText.psm(), 11);
    }
}
