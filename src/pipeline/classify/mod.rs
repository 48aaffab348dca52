pub mod classifier;
pub mod client;
pub mod keywords;
pub mod parser;
pub mod prompt;
pub mod types;

pub use classifier::*;
pub use client::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("No classification backend configured")]
    NotConfigured,

    #[error("Cannot connect to classification backend at {0}")]
    Connection(String),

    #[error("Backend returned HTTP {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid model name: {0}")]
    InvalidModelName(String),

    #[error("JSON parsing failed: {0}")]
    JsonParsing(String),
}
