use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::bank::QuestionBank;
use crate::model::difficulty::{DifficultyLevel, DifficultyTier};
use crate::model::ids::{QuestionId, SessionId};
use crate::model::question::OptionIndex;
use crate::model::tag::TagName;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionReportError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("a session needs at least one question")]
    ZeroQuestions,

    #[error("{answered} answers recorded for a {total}-question session")]
    TooManyAnswers { answered: usize, total: u32 },
}

/// Lifecycle of a single assessment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Complete,
}

/// What ended a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Every question of the fixed-length session was answered.
    AllAnswered,
    /// No unused question was left at the needed or adjacent tiers.
    Exhausted,
    /// The caller's time budget ran out.
    Expired,
}

impl fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompletionReason::AllAnswered => "all questions answered",
            CompletionReason::Exhausted => "question bank exhausted",
            CompletionReason::Expired => "time limit reached",
        };
        f.write_str(text)
    }
}

/// One entry of a session's append-only answer history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_id: QuestionId,
    pub tier: DifficultyTier,
    pub chosen: OptionIndex,
    pub correct: bool,
    pub points: u32,
    pub difficulty_after: DifficultyLevel,
}

/// Accuracy for one tag across a session (or several).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPerformance {
    pub tag: TagName,
    pub attempted: u32,
    pub correct: u32,
}

impl TagPerformance {
    #[must_use]
    pub fn percent(&self) -> u32 {
        rounded_percent(self.correct, self.attempted)
    }
}

/// Final result of a completed assessment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    session_id: SessionId,
    final_score: u32,
    questions_completed: u32,
    total_questions: u32,
    correct_answers: u32,
    final_difficulty: DifficultyLevel,
    completion: CompletionReason,
    history: Vec<AnsweredQuestion>,
    tag_breakdown: Vec<TagPerformance>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionReport {
    /// Aggregate a report from a finished session's answer history.
    ///
    /// The score is the sum of points in `history`, so it always agrees with
    /// the per-answer record. Tags are resolved through `bank`; questions no
    /// longer present there simply contribute no tags.
    ///
    /// # Errors
    ///
    /// Returns `SessionReportError` for an inverted time range, a zero-length
    /// session, or more answers than questions.
    #[allow(clippy::too_many_arguments)]
    pub fn from_history(
        session_id: SessionId,
        total_questions: usize,
        final_difficulty: DifficultyLevel,
        completion: CompletionReason,
        history: Vec<AnsweredQuestion>,
        bank: &QuestionBank,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> Result<Self, SessionReportError> {
        if completed_at < started_at {
            return Err(SessionReportError::InvalidTimeRange);
        }
        let total = u32::try_from(total_questions).unwrap_or(u32::MAX);
        if total == 0 {
            return Err(SessionReportError::ZeroQuestions);
        }
        let answered = history.len();
        let questions_completed = u32::try_from(answered)
            .ok()
            .filter(|&n| n <= total)
            .ok_or(SessionReportError::TooManyAnswers { answered, total })?;

        let mut final_score = 0_u32;
        let mut correct_answers = 0_u32;
        let mut by_tag: BTreeMap<TagName, (u32, u32)> = BTreeMap::new();

        for answer in &history {
            final_score = final_score.saturating_add(answer.points);
            if answer.correct {
                correct_answers += 1;
            }
            let Some(question) = bank.get(answer.question_id) else {
                continue;
            };
            for tag in question.tags() {
                let entry = by_tag.entry(tag.clone()).or_default();
                entry.0 += 1;
                if answer.correct {
                    entry.1 += 1;
                }
            }
        }

        let tag_breakdown = by_tag
            .into_iter()
            .map(|(tag, (attempted, correct))| TagPerformance {
                tag,
                attempted,
                correct,
            })
            .collect();

        Ok(Self {
            session_id,
            final_score,
            questions_completed,
            total_questions: total,
            correct_answers,
            final_difficulty,
            completion,
            history,
            tag_breakdown,
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn final_score(&self) -> u32 {
        self.final_score
    }

    #[must_use]
    pub fn questions_completed(&self) -> u32 {
        self.questions_completed
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn final_difficulty(&self) -> DifficultyLevel {
        self.final_difficulty
    }

    #[must_use]
    pub fn final_difficulty_tier(&self) -> DifficultyTier {
        self.final_difficulty.tier()
    }

    #[must_use]
    pub fn completion(&self) -> CompletionReason {
        self.completion
    }

    #[must_use]
    pub fn history(&self) -> &[AnsweredQuestion] {
        &self.history
    }

    #[must_use]
    pub fn tag_breakdown(&self) -> &[TagPerformance] {
        &self.tag_breakdown
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    /// `round(score / total_questions * 100)`.
    ///
    /// The score is a points total (up to 4 per answer), so this can exceed 100.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        rounded_percent(self.final_score, self.total_questions)
    }

    /// Share of the session's questions answered correctly, 0..=100.
    #[must_use]
    pub fn accuracy_percent(&self) -> u32 {
        rounded_percent(self.correct_answers, self.total_questions)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    (f64::from(part) / f64::from(whole) * 100.0).round() as u32
}
