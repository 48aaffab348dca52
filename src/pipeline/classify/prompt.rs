//! Prompt construction for the classification backend.

use crate::models::DocumentType;

use super::types::TAG_VOCABULARY;

pub const SYSTEM_PROMPT: &str = "You are a document classifier for a relocation \
assistance service. Users upload personal documents needed when moving to another \
country. Respond with a single JSON object and nothing else.";

/// Build the classification prompt: instructions, the closed vocabularies,
/// the file name, and a window of extracted text.
pub fn build_prompt(file_name: &str, text: &str, window: usize) -> String {
    let types: Vec<&str> = DocumentType::priority_order()
        .iter()
        .map(|t| t.as_str())
        .collect();

    format!(
        "Classify this document.\n\n\
         Allowed document_type values: {}\n\
         Allowed tags: {}\n\n\
         Respond with JSON:\n\
         {{\"document_type\": \"...\", \"confidence\": 0.0, \"tags\": [], \
         \"extracted_fields\": {{}}, \"requires_review\": false}}\n\n\
         confidence is your certainty from 0.0 to 1.0. extracted_fields holds \
         key facts you can read from the text (names, dates, amounts, reference \
         numbers) as flat string values. Set requires_review to true when the \
         text is hard to read or the classification is a guess.\n\n\
         File name: {}\n\n\
         Document text:\n{}",
        types.join(", "),
        TAG_VOCABULARY.join(", "),
        file_name,
        truncate_on_char_boundary(text, window),
    )
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
pub fn truncate_on_char_boundary(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
