pub mod classify;
pub mod dedup;
pub mod extraction;
pub mod intake;
pub mod lineage;
pub mod processor;

pub use processor::{DocumentProcessor, ProcessOutcome, ProcessorError, UploadRequest};
