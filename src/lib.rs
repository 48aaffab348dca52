//! relodoc — document intake pipeline for a relocation assistance service.
//!
//! Uploads flow through one synchronous pipeline: format detection and
//! content hashing, a text-extraction cascade (native PDF layer, OCR,
//! vision fallback), classification against a closed document-type
//! vocabulary (AI backend with a deterministic keyword fallback),
//! similarity-based duplicate detection, and an append-only version
//! lineage with restore and diff. Storage is SQLite.

pub mod config;
pub mod db;
pub mod models;
pub mod pipeline;

pub use config::PipelineConfig;
pub use pipeline::{DocumentProcessor, ProcessOutcome, ProcessorError, UploadRequest};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default filter. Safe to call once per process; embedders that bring
/// their own subscriber skip this.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("relodoc=info")),
        )
        .init();
}
