//! Deterministic keyword classifier.
//!
//! The fallback branch when no AI backend is configured or its response
//! is unusable. Keywords cover German, English, and French, since those
//! are the languages relocation documents actually arrive in. A hit in
//! the file name is worth more than one in the body: users name files
//! after what the document is.

use crate::models::DocumentType;

/// Confidence for a body-text keyword hit.
const TEXT_HIT_CONFIDENCE: f64 = 0.6;
/// Added when the file name itself names the type.
const FILENAME_BOOST: f64 = 0.3;
/// Assigned when nothing matches; always flagged for review.
const NO_MATCH_CONFIDENCE: f64 = 0.3;

const KEYWORD_TABLE: &[(DocumentType, &[&str])] = &[
    (
        DocumentType::Passport,
        &["passport", "reisepass", "passeport", "machine readable zone"],
    ),
    (
        DocumentType::ResidencePermit,
        &[
            "residence permit",
            "aufenthaltstitel",
            "aufenthaltserlaubnis",
            "titre de sejour",
            "titre de séjour",
            "niederlassungserlaubnis",
        ],
    ),
    (
        DocumentType::BirthCertificate,
        &[
            "birth certificate",
            "geburtsurkunde",
            "acte de naissance",
            "certificate of birth",
        ],
    ),
    (
        DocumentType::MarriageCertificate,
        &[
            "marriage certificate",
            "heiratsurkunde",
            "eheurkunde",
            "acte de mariage",
        ],
    ),
    (
        DocumentType::RentalContract,
        &[
            "rental agreement",
            "rental contract",
            "tenancy agreement",
            "mietvertrag",
            "untermietvertrag",
            "contrat de bail",
            "contrat de location",
            "landlord",
            "vermieter",
        ],
    ),
    (
        DocumentType::EmploymentContract,
        &[
            "employment contract",
            "employment agreement",
            "arbeitsvertrag",
            "contrat de travail",
            "arbeitgeber",
        ],
    ),
    (
        DocumentType::VaccinationRecord,
        &[
            "vaccination",
            "impfpass",
            "impfausweis",
            "impfung",
            "carnet de vaccination",
            "immunization",
        ],
    ),
    (
        DocumentType::BankDocument,
        &[
            "bank statement",
            "kontoauszug",
            "releve de compte",
            "relevé de compte",
            "iban",
            "account statement",
        ],
    ),
    (
        DocumentType::InsuranceDocument,
        &[
            "insurance",
            "versicherung",
            "versicherungsschein",
            "attestation d'assurance",
            "krankenversicherung",
        ],
    ),
    (
        DocumentType::SchoolDocument,
        &[
            "school",
            "zeugnis",
            "schulbescheinigung",
            "certificat de scolarite",
            "certificat de scolarité",
            "enrollment",
            "diploma",
        ],
    ),
];

/// Default tags for each document type, drawn from the closed vocabulary.
pub fn default_tags(doc_type: DocumentType) -> Vec<String> {
    let tags: &[&str] = match doc_type {
        DocumentType::Passport => &["identity", "travel", "official"],
        DocumentType::ResidencePermit => &["identity", "residence", "official"],
        DocumentType::BirthCertificate => &["identity", "family", "official"],
        DocumentType::MarriageCertificate => &["family", "legal", "official"],
        DocumentType::RentalContract => &["housing", "legal"],
        DocumentType::EmploymentContract => &["employment", "legal"],
        DocumentType::VaccinationRecord => &["health", "official"],
        DocumentType::BankDocument => &["financial"],
        DocumentType::InsuranceDocument => &["insurance", "financial"],
        DocumentType::SchoolDocument => &["education"],
        DocumentType::Other => &[],
    };
    tags.iter().map(|t| t.to_string()).collect()
}

/// Result of the keyword scorer
#[derive(Debug, Clone)]
pub struct KeywordMatch {
    pub doc_type: DocumentType,
    pub confidence: f64,
}

/// Score the file name and text against the keyword table.
///
/// Types are tried in priority order, so a text that mentions both a
/// passport and an insurance policy lands on the identity document.
/// No match at all yields `Other` at review-forcing confidence.
pub fn classify_by_keywords(file_name: &str, text: &str) -> KeywordMatch {
    let name_lower = file_name.to_lowercase().replace(['_', '-'], " ");
    let text_lower = text.to_lowercase();

    let mut best: Option<KeywordMatch> = None;
    for (doc_type, keywords) in KEYWORD_TABLE {
        let name_hit = keywords.iter().any(|k| name_lower.contains(k));
        let text_hit = keywords.iter().any(|k| text_lower.contains(k));
        if !name_hit && !text_hit {
            continue;
        }

        let mut confidence = TEXT_HIT_CONFIDENCE;
        if name_hit {
            confidence += FILENAME_BOOST;
        }

        // Priority order resolves ties, so only a strictly better score wins
        let better = match &best {
            Some(current) => confidence > current.confidence,
            None => true,
        };
        if better {
            best = Some(KeywordMatch {
                doc_type: *doc_type,
                confidence,
            });
        }
    }

    best.unwrap_or(KeywordMatch {
        doc_type: DocumentType::Other,
        confidence: NO_MATCH_CONFIDENCE,
    })
}
