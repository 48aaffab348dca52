use serde::{Deserialize, Serialize};

/// Closed document-type vocabulary. Anything a classifier returns outside
/// this set collapses to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Passport,
    BirthCertificate,
    MarriageCertificate,
    EmploymentContract,
    RentalContract,
    VaccinationRecord,
    ResidencePermit,
    BankDocument,
    InsuranceDocument,
    SchoolDocument,
    Other,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::BirthCertificate => "birth_certificate",
            Self::MarriageCertificate => "marriage_certificate",
            Self::EmploymentContract => "employment_contract",
            Self::RentalContract => "rental_contract",
            Self::VaccinationRecord => "vaccination_record",
            Self::ResidencePermit => "residence_permit",
            Self::BankDocument => "bank_document",
            Self::InsuranceDocument => "insurance_document",
            Self::SchoolDocument => "school_document",
            Self::Other => "other",
        }
    }

    /// Parse a type string; unrecognized values collapse to `Other`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "passport" => Self::Passport,
            "birth_certificate" | "birth certificate" => Self::BirthCertificate,
            "marriage_certificate" | "marriage certificate" => Self::MarriageCertificate,
            "employment_contract" | "employment contract" | "work_contract" => {
                Self::EmploymentContract
            }
            "rental_contract" | "rental contract" | "lease" => Self::RentalContract,
            "vaccination_record" | "vaccination record" => Self::VaccinationRecord,
            "residence_permit" | "residence permit" => Self::ResidencePermit,
            "bank_document" | "bank_documents" | "bank document" => Self::BankDocument,
            "insurance_document" | "insurance_documents" | "insurance document" => {
                Self::InsuranceDocument
            }
            "school_document" | "school_documents" | "school document" => Self::SchoolDocument,
            _ => Self::Other,
        }
    }

    /// All types in classification priority order: identity documents first,
    /// `Other` last. Keyword-fallback ties resolve to the earlier entry.
    pub fn priority_order() -> &'static [DocumentType] {
        &[
            Self::Passport,
            Self::ResidencePermit,
            Self::BirthCertificate,
            Self::MarriageCertificate,
            Self::RentalContract,
            Self::EmploymentContract,
            Self::VaccinationRecord,
            Self::BankDocument,
            Self::InsuranceDocument,
            Self::SchoolDocument,
            Self::Other,
        ]
    }
}

/// Processing state of a document's latest upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
