//! Vision fallback: hand the page image to a multimodal model behind an
//! Ollama-compatible endpoint and take its transcription. Last rung of
//! the cascade, only reached when native extraction and OCR both failed
//! to produce usable text.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::VisionClient;
use super::ExtractionError;

const TRANSCRIBE_PROMPT: &str = "Transcribe all text visible in this document image. \
Output only the text, preserving line breaks. Do not describe the image or add commentary.";

pub struct HttpVisionClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl HttpVisionClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ExtractionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ExtractionError::Vision(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    images: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl VisionClient for HttpVisionClient {
    fn read_image(&self, image_bytes: &[u8]) -> Result<String, ExtractionError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: TRANSCRIBE_PROMPT,
            images: vec![base64::engine::general_purpose::STANDARD.encode(image_bytes)],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Vision("vision request timed out".into())
                } else {
                    ExtractionError::Vision(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractionError::Vision(format!(
                "vision backend returned {status}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ExtractionError::Vision(format!("bad response body: {e}")))?;
        Ok(parsed.response)
    }
}

/// Scripted vision client for tests.
#[cfg(test)]
pub struct MockVisionClient {
    pub response: Result<String, String>,
}

#[cfg(test)]
impl VisionClient for MockVisionClient {
    fn read_image(&self, _image_bytes: &[u8]) -> Result<String, ExtractionError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(ExtractionError::Vision(msg.clone())),
        }
    }
}
