use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::difficulty::DifficultyTier;
use crate::model::ids::QuestionId;
use crate::model::tag::{TagError, TagName};

/// Every question carries exactly this many options, labelled A–D.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id must be positive")]
    InvalidId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option {index} cannot be empty")]
    EmptyOption { index: OptionIndex },

    #[error("option index must be between 0 and 3, got {0}")]
    OptionOutOfRange(u8),

    #[error("option label must be one of A-D, got {0:?}")]
    InvalidLabel(char),

    #[error(transparent)]
    Tag(#[from] TagError),
}

//
// ─── OPTION INDEX ─────────────────────────────────────────────────────────────
//

/// Zero-based position of an answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct OptionIndex(u8);

impl OptionIndex {
    /// # Errors
    ///
    /// Returns `QuestionError::OptionOutOfRange` for anything past the fourth option.
    pub fn new(value: u8) -> Result<Self, QuestionError> {
        if usize::from(value) < OPTION_COUNT {
            Ok(Self(value))
        } else {
            Err(QuestionError::OptionOutOfRange(value))
        }
    }

    /// Parses an option letter, case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidLabel` for anything other than A–D.
    pub fn from_label(label: char) -> Result<Self, QuestionError> {
        match label.to_ascii_uppercase() {
            'A' => Ok(Self(0)),
            'B' => Ok(Self(1)),
            'C' => Ok(Self(2)),
            'D' => Ok(Self(3)),
            _ => Err(QuestionError::InvalidLabel(label)),
        }
    }

    #[must_use]
    pub fn label(self) -> char {
        match self.0 {
            0 => 'A',
            1 => 'B',
            2 => 'C',
            _ => 'D',
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::from(self.0)
    }

    /// All option positions in display order.
    pub fn all() -> impl Iterator<Item = OptionIndex> {
        (0..OPTION_COUNT as u8).map(OptionIndex)
    }
}

impl fmt::Display for OptionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl TryFrom<u8> for OptionIndex {
    type Error = QuestionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OptionIndex> for u8 {
    fn from(index: OptionIndex) -> Self {
        index.0
    }
}

//
// ─── QUESTION DRAFT ───────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in a bank document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: u64,
    pub text: String,
    pub options: [String; OPTION_COUNT],
    pub correct_option: u8,
    pub tier: DifficultyTier,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionDraft {
    /// Validate and normalize the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` for a zero id, blank text or options, an
    /// out-of-range answer key, or an empty tag.
    pub fn validate(self) -> Result<Question, QuestionError> {
        if self.id == 0 {
            return Err(QuestionError::InvalidId);
        }

        let text = self.text.trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }

        let correct_option = OptionIndex::new(self.correct_option)?;

        let mut options: [String; OPTION_COUNT] = Default::default();
        for (index, raw) in OptionIndex::all().zip(self.options) {
            let option = raw.trim().to_string();
            if option.is_empty() {
                return Err(QuestionError::EmptyOption { index });
            }
            options[index.as_usize()] = option;
        }

        let tags = self
            .tags
            .into_iter()
            .map(TagName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(Question {
            id: QuestionId::new(self.id),
            text,
            options,
            correct_option,
            tier: self.tier,
            tags,
            subject: normalize_optional(self.subject),
            hint: normalize_optional(self.hint),
            explanation: normalize_optional(self.explanation),
        })
    }
}

impl From<&Question> for QuestionDraft {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.value(),
            text: question.text.clone(),
            options: question.options.clone(),
            correct_option: question.correct_option.value(),
            tier: question.tier,
            tags: question.tags.iter().map(|t| t.as_str().to_string()).collect(),
            subject: question.subject.clone(),
            hint: question.hint.clone(),
            explanation: question.explanation.clone(),
        }
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// An immutable multiple-choice question with a difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; OPTION_COUNT],
    correct_option: OptionIndex,
    tier: DifficultyTier,
    tags: BTreeSet<TagName>,
    subject: Option<String>,
    hint: Option<String>,
    explanation: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: OptionIndex) -> &str {
        &self.options[index.as_usize()]
    }

    #[must_use]
    pub fn correct_option(&self) -> OptionIndex {
        self.correct_option
    }

    #[must_use]
    pub fn tier(&self) -> DifficultyTier {
        self.tier
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<TagName> {
        &self.tags
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, chosen: OptionIndex) -> bool {
        chosen == self.correct_option
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
