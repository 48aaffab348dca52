//! Usability predicate for extracted text.
//!
//! A stage's output only stops the cascade when it clears this bar;
//! otherwise the next strategy gets its turn.

/// Count of characters that are not whitespace.
pub fn substantive_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// Usable means enough substantive characters to classify against.
pub fn is_usable(text: &str, min_chars: usize) -> bool {
    substantive_chars(text) >= min_chars
}

/// Collapse runs of blank lines, strip control characters, and trim.
/// OCR output in particular arrives riddled with both.
pub fn sanitize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0usize;
    for line in raw.lines() {
        let line: String = line
            .chars()
            .filter(|c| !c.is_control() || *c == '\t')
            .collect();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }
    out.trim().to_string()
}
