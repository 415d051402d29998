use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

use crate::model::difficulty::DifficultyTier;
use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};
use crate::model::tag::TagName;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BankError {
    #[error("duplicate question id {0}")]
    DuplicateId(QuestionId),

    #[error("question {id} is invalid: {source}")]
    InvalidQuestion {
        id: u64,
        #[source]
        source: QuestionError,
    },
}

/// Number of questions available per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub very_easy: usize,
    pub easy: usize,
    pub moderate: usize,
    pub difficult: usize,
}

impl TierCounts {
    #[must_use]
    pub fn get(&self, tier: DifficultyTier) -> usize {
        match tier {
            DifficultyTier::VeryEasy => self.very_easy,
            DifficultyTier::Easy => self.easy,
            DifficultyTier::Moderate => self.moderate,
            DifficultyTier::Difficult => self.difficult,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.very_easy + self.easy + self.moderate + self.difficult
    }
}

/// Read-only, pre-loaded question pool.
///
/// Built once and shared by every session drawing from it; sessions keep
/// their own exclusion sets and never mutate the bank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl QuestionBank {
    /// Build a bank, preserving the given order.
    ///
    /// # Errors
    ///
    /// Returns `BankError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        let mut index = HashMap::with_capacity(questions.len());
        for (pos, question) in questions.iter().enumerate() {
            if index.insert(question.id(), pos).is_some() {
                return Err(BankError::DuplicateId(question.id()));
            }
        }
        Ok(Self { questions, index })
    }

    /// Validate every draft and build a bank from the results.
    ///
    /// # Errors
    ///
    /// Returns `BankError::InvalidQuestion` naming the first draft that fails
    /// validation, or `BankError::DuplicateId`.
    pub fn from_drafts(drafts: impl IntoIterator<Item = QuestionDraft>) -> Result<Self, BankError> {
        let questions = drafts
            .into_iter()
            .map(|draft| {
                let id = draft.id;
                draft
                    .validate()
                    .map_err(|source| BankError::InvalidQuestion { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&Question> {
        self.index.get(&id).map(|&pos| &self.questions[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Questions in `tier`, in bank order.
    pub fn by_tier(&self, tier: DifficultyTier) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(move |q| q.tier() == tier)
    }

    /// Questions in `tier` whose ids are not in `used`, in bank order.
    pub fn unused_in_tier<'a, 'u>(
        &'a self,
        tier: DifficultyTier,
        used: &'u HashSet<QuestionId>,
    ) -> impl Iterator<Item = &'a Question> + 'u
    where
        'a: 'u,
    {
        self.by_tier(tier).filter(move |q| !used.contains(&q.id()))
    }

    #[must_use]
    pub fn tier_counts(&self) -> TierCounts {
        let mut counts = TierCounts::default();
        for question in &self.questions {
            match question.tier() {
                DifficultyTier::VeryEasy => counts.very_easy += 1,
                DifficultyTier::Easy => counts.easy += 1,
                DifficultyTier::Moderate => counts.moderate += 1,
                DifficultyTier::Difficult => counts.difficult += 1,
            }
        }
        counts
    }

    /// The questions whose subject or one of whose tags matches a topic,
    /// ignoring ASCII case. An empty topic set keeps every question.
    #[must_use]
    pub fn restricted_to(&self, topics: &BTreeSet<TagName>) -> Self {
        if topics.is_empty() {
            return self.clone();
        }
        let matches = |name: &str| topics.iter().any(|t| t.as_str().eq_ignore_ascii_case(name));
        let questions: Vec<Question> = self
            .questions
            .iter()
            .filter(|q| {
                q.subject().is_some_and(matches) || q.tags().iter().any(|t| matches(t.as_str()))
            })
            .cloned()
            .collect();
        let index = questions
            .iter()
            .enumerate()
            .map(|(pos, q)| (q.id(), pos))
            .collect();
        Self { questions, index }
    }

    /// Distinct subjects mentioned by the questions, sorted.
    #[must_use]
    pub fn subjects(&self) -> BTreeSet<&str> {
        self.questions.iter().filter_map(Question::subject).collect()
    }
}
