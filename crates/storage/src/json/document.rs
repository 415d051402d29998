use quiz_core::model::{QuestionBank, QuestionDraft};
use serde::{Deserialize, Serialize};

use crate::repository::StorageError;

/// Current bank document version.
pub const BANK_FORMAT_VERSION: u32 = 1;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Serialized shape of a question bank.
///
/// A document-level `subject` applies to every question that does not name
/// its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDocument {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub questions: Vec<QuestionDraft>,
}

impl BankDocument {
    /// Parse a document without validating its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON.
    pub fn parse(json: &str) -> Result<Self, StorageError> {
        serde_json::from_str(json).map_err(ser)
    }

    /// Snapshot a bank as a document.
    #[must_use]
    pub fn from_bank(subject: Option<String>, bank: &QuestionBank) -> Self {
        let questions = bank
            .iter()
            .map(|question| {
                let mut draft = QuestionDraft::from(question);
                if draft.subject == subject {
                    draft.subject = None;
                }
                draft
            })
            .collect();
        Self {
            version: BANK_FORMAT_VERSION,
            subject,
            questions,
        }
    }

    /// Validate the document into a bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnsupportedVersion` for unknown versions and
    /// `StorageError::InvalidBank` when a question fails validation.
    pub fn into_bank(self) -> Result<QuestionBank, StorageError> {
        if self.version != BANK_FORMAT_VERSION {
            return Err(StorageError::UnsupportedVersion(self.version));
        }
        let subject = self.subject;
        let drafts = self.questions.into_iter().map(|mut draft| {
            if draft.subject.is_none() {
                draft.subject.clone_from(&subject);
            }
            draft
        });
        Ok(QuestionBank::from_drafts(drafts)?)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json_pretty(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(self).map_err(ser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{BankError, QuestionId};

    const DOC: &str = r#"{
        "version": 1,
        "subject": "Mathematics",
        "questions": [
            {
                "id": 1,
                "text": "0.01 is what percent of 0.1?",
                "options": ["1%", "10%", "100%", "1000%"],
                "correct_option": 1,
                "tier": "very_easy",
                "tags": ["Percentages"]
            },
            {
                "id": 2,
                "text": "A car travels 60 km in 1 hour. What is its speed?",
                "options": ["30", "60", "90", "120"],
                "correct_option": 1,
                "tier": "easy",
                "subject": "Physics"
            }
        ]
    }"#;

    #[test]
    fn document_subject_fills_missing_question_subjects() {
        let bank = BankDocument::parse(DOC).unwrap().into_bank().unwrap();
        assert_eq!(bank.get(QuestionId::new(1)).unwrap().subject(), Some("Mathematics"));
        assert_eq!(bank.get(QuestionId::new(2)).unwrap().subject(), Some("Physics"));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut doc = BankDocument::parse(DOC).unwrap();
        doc.version = 7;
        assert!(matches!(
            doc.into_bank(),
            Err(StorageError::UnsupportedVersion(7))
        ));
    }

    #[test]
    fn invalid_question_surfaces_bank_error() {
        let mut doc = BankDocument::parse(DOC).unwrap();
        doc.questions[1].correct_option = 9;
        assert!(matches!(
            doc.into_bank(),
            Err(StorageError::InvalidBank(BankError::InvalidQuestion { id: 2, .. }))
        ));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        assert!(matches!(
            BankDocument::parse("{ not json"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn snapshot_omits_subjects_matching_the_document() {
        let bank = BankDocument::parse(DOC).unwrap().into_bank().unwrap();
        let doc = BankDocument::from_bank(Some("Mathematics".into()), &bank);
        assert_eq!(doc.questions[0].subject, None);
        assert_eq!(doc.questions[1].subject.as_deref(), Some("Physics"));
        assert_eq!(doc.into_bank().unwrap(), bank);
    }
}
