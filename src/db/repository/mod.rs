pub mod document;
pub mod version;
