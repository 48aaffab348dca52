use serde::{Deserialize, Serialize};

use super::types::ClassifyClient;
use super::ClassifyError;
use crate::config::PipelineConfig;

/// Ollama-compatible HTTP client for classification.
pub struct OllamaClassifyClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

/// Accepts `[namespace/]model[:tag]` with at most one namespace segment.
/// Each segment must start with an alphanumeric, which blocks `../`, `./`
/// and other path-shaped names before they reach a request body.
fn validate_model_name(name: &str) -> Result<(), ClassifyError> {
    let valid = regex::Regex::new(
        r"^[a-zA-Z0-9][a-zA-Z0-9._-]*(/[a-zA-Z0-9][a-zA-Z0-9._-]*)?(:[a-zA-Z0-9._-]+)?$",
    )
    .map_err(|e| ClassifyError::HttpClient(e.to_string()))?;

    if name.is_empty() || !valid.is_match(name) {
        return Err(ClassifyError::InvalidModelName(name.to_string()));
    }
    Ok(())
}

impl OllamaClassifyClient {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, ClassifyError> {
        validate_model_name(model)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClassifyError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl ClassifyClient for OllamaClassifyClient {
    fn generate(&self, system: &str, prompt: &str) -> Result<String, ClassifyError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                ClassifyError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                ClassifyError::HttpClient(format!(
                    "Request timed out after {}s",
                    self.timeout_secs
                ))
            } else {
                ClassifyError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClassifyError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| ClassifyError::MalformedResponse(e.to_string()))?;
        Ok(parsed.response)
    }
}

/// Stands in when no AI endpoint is configured. Every call reports
/// `NotConfigured`, which routes classification to the keyword branch.
pub struct NullClassifyClient;

impl ClassifyClient for NullClassifyClient {
    fn generate(&self, _system: &str, _prompt: &str) -> Result<String, ClassifyError> {
        Err(ClassifyError::NotConfigured)
    }
}

/// Pick a client from configuration.
pub fn client_from_config(
    config: &PipelineConfig,
) -> Result<Box<dyn ClassifyClient + Send + Sync>, ClassifyError> {
    match &config.ai_endpoint {
        Some(endpoint) => Ok(Box::new(OllamaClassifyClient::new(
            endpoint,
            &config.ai_model,
            config.ai_timeout_secs,
        )?)),
        None => Ok(Box::new(NullClassifyClient)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_client_reports_not_configured() {
        let err = NullClassifyClient.generate("sys", "prompt").unwrap_err();
        assert!(matches!(err, ClassifyError::NotConfigured));
    }

    #[test]
    fn model_names_with_tags_and_namespaces_accepted() {
        for name in ["llama3.2", "llama3.2:3b", "community/llama3.2:3b"] {
            assert!(validate_model_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn path_shaped_model_names_rejected() {
        for name in ["", "../etc/passwd", "a/b/c", "/leading", "trailing/"] {
            assert!(validate_model_name(name).is_err(), "{name:?}");
        }
    }

    #[test]
    fn unconfigured_endpoint_yields_null_client() {
        let config = PipelineConfig::default();
        let client = client_from_config(&config).unwrap();
        assert!(matches!(
            client.generate("sys", "prompt"),
            Err(ClassifyError::NotConfigured)
        ));
    }
}
