//! Lightweight language detection for extracted text.
//!
//! Relocation documents arrive overwhelmingly in German, English, or
//! French. Function-word frequency separates those three reliably without
//! an external model; anything inconclusive falls back to English.

const GERMAN_INDICATORS: &[&str] = &[
    "der ", "die ", "das ", "und ", "ist ", "nicht ", "ein ", "eine ", "mit ",
    "für ", "von ", "auf ", "dem ", "den ", "des ", "im ", "zum ", "zur ",
    "wird ", "sind ", "werden ", "oder ", "bei ", "nach ", "über ",
    // Domain German
    "vertrag", "wohnung", "mietvertrag", "arbeitgeber", "bescheinigung",
    "anmeldung", "aufenthalt", "geburtsurkunde", "versicherung", "gehalt",
];

const ENGLISH_INDICATORS: &[&str] = &[
    "the ", "and ", "was ", "for ", "are ", "not ", "you ", "all ", "can ",
    "has ", "his ", "her ", "its ", "our ", "out ", "who ", "been ", "from ",
    "have ", "this ", "that ", "with ", "they ", "will ", "shall ",
    // Domain English
    "contract", "agreement", "tenant", "landlord", "employer", "salary",
    "certificate", "insurance", "permit", "residence",
];

const FRENCH_INDICATORS: &[&str] = &[
    "le ", "la ", "les ", "un ", "une ", "des ", "du ", "et ", "est ", "en ",
    "au ", "aux ", "pour ", "par ", "sur ", "dans ", "avec ", "qui ", "que ",
    "pas ", "ce ", "cette ", "d'", "l'", "qu'",
    // Domain French
    "contrat", "bail", "locataire", "employeur", "salaire", "attestation",
    "assurance", "titre de séjour", "naissance",
];

/// Detect the primary language of extracted text.
/// Returns an ISO 639-1 code: "de", "en", or "fr". English wins ties and
/// too-short input.
pub fn detect_language(text: &str) -> String {
    if text.trim().len() < 20 {
        return "en".to_string();
    }

    let lower = text.to_lowercase();

    let german = count_indicators(&lower, GERMAN_INDICATORS) + count_german_chars(&lower);
    let english = count_indicators(&lower, ENGLISH_INDICATORS);
    let french = count_indicators(&lower, FRENCH_INDICATORS);

    if german > english && german >= french {
        "de".to_string()
    } else if french > english && french > german {
        "fr".to_string()
    } else {
        "en".to_string()
    }
}

fn count_indicators(lower_text: &str, indicators: &[&str]) -> u32 {
    let mut score = 0u32;
    for &indicator in indicators {
        score += lower_text.matches(indicator).count() as u32;
    }
    score
}

/// Umlauts and eszett are strong German signals; weight 2 chars per point.
fn count_german_chars(lower_text: &str) -> u32 {
    let count = lower_text
        .chars()
        .filter(|ch| matches!(ch, 'ä' | 'ö' | 'ü' | 'ß'))
        .count() as u32;
    count / 2
}
