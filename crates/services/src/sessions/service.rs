use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use quiz_core::Clock;
use quiz_core::model::{
    AnsweredQuestion, AssessmentSettings, CompletionReason, DifficultyLevel, OptionIndex,
    Question, QuestionBank, QuestionId, SessionId, SessionReport, SessionStatus,
};

use super::plan::select_next;
use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── ANSWER OUTCOME ───────────────────────────────────────────────────────────
//

/// Result of answering the current question, shown before the caller advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: QuestionId,
    pub chosen: OptionIndex,
    pub correct: bool,
    pub correct_option: OptionIndex,
    pub points: u32,
    pub new_difficulty: DifficultyLevel,
    pub explanation: Option<String>,
}

//
// ─── ENGINE ───────────────────────────────────────────────────────────────────
//

/// One adaptive assessment session over a shared, read-only question bank.
///
/// The caller drives it as `start → (record_answer → advance)* → finalize`,
/// and may call `expire` at any point to end it early. Each instance owns its
/// own state; concurrent learners each get their own engine.
pub struct AssessmentEngine {
    id: SessionId,
    bank: Arc<QuestionBank>,
    total_questions: usize,
    clock: Clock,
    rng: StdRng,
    current: Option<QuestionId>,
    current_index: usize,
    difficulty: DifficultyLevel,
    score: u32,
    used: HashSet<QuestionId>,
    history: Vec<AnsweredQuestion>,
    awaiting_advance: bool,
    status: SessionStatus,
    completion: Option<CompletionReason>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    report: Option<SessionReport>,
    report_id: Option<SessionId>,
}

impl AssessmentEngine {
    /// Start a session drawing randomness from the operating system.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question can be drawn at the
    /// starting difficulty or its neighbours.
    pub fn start(
        bank: Arc<QuestionBank>,
        settings: &AssessmentSettings,
        clock: Clock,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(bank, settings, clock, StdRng::from_os_rng())
    }

    /// Start a reproducible session; the same seed and bank yield the same questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question can be drawn.
    pub fn start_seeded(
        bank: Arc<QuestionBank>,
        settings: &AssessmentSettings,
        clock: Clock,
        seed: u64,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(bank, settings, clock, StdRng::seed_from_u64(seed))
    }

    /// Start a session with an explicit random source.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no question can be drawn.
    pub fn start_with_rng(
        bank: Arc<QuestionBank>,
        settings: &AssessmentSettings,
        clock: Clock,
        mut rng: StdRng,
    ) -> Result<Self, SessionError> {
        let difficulty = settings.starting_difficulty();
        let first = select_next(&bank, difficulty, &HashSet::new(), &mut rng)
            .map(Question::id)
            .ok_or(SessionError::Empty)?;

        let id = SessionId::new();
        let total_questions = settings.total_questions();
        info!(
            session_id = %id,
            total_questions,
            bank_size = bank.len(),
            "assessment started"
        );

        Ok(Self {
            id,
            bank,
            total_questions,
            clock,
            rng,
            current: Some(first),
            current_index: 0,
            difficulty,
            score: 0,
            used: HashSet::from([first]),
            history: Vec::new(),
            awaiting_advance: false,
            status: SessionStatus::InProgress,
            completion: None,
            started_at: clock.now(),
            completed_at: None,
            report: None,
            report_id: None,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Complete
    }

    #[must_use]
    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.total_questions
    }

    /// Number of questions advanced past so far.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn difficulty(&self) -> DifficultyLevel {
        self.difficulty
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn used_question_ids(&self) -> &HashSet<QuestionId> {
        &self.used
    }

    #[must_use]
    pub fn history(&self) -> &[AnsweredQuestion] {
        &self.history
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// True between `record_answer` and `advance`, while the result is on screen.
    #[must_use]
    pub fn is_awaiting_advance(&self) -> bool {
        self.awaiting_advance
    }

    /// The question on screen, or `None` once the session is complete.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.current.and_then(|id| self.bank.get(id))
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let answered = self.history.len();
        SessionProgress {
            total: self.total_questions,
            answered,
            position: self.current.map(|_| self.current_index + 1),
            remaining: self.total_questions.saturating_sub(answered),
            difficulty: self.difficulty,
            is_complete: self.is_complete(),
        }
    }

    /// Grade `choice` against the current question and adjust difficulty.
    ///
    /// A correct answer scores `max(1, difficulty)` points and moves one step
    /// up the ladder; a wrong answer moves one step down. The session does
    /// not advance until `advance` is called.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is complete or the
    /// current question was already answered, and
    /// `SessionError::InvalidOption` if `choice` is not in 0..=3.
    pub fn record_answer(&mut self, choice: u8) -> Result<AnswerOutcome, SessionError> {
        const OP: &str = "record answer";
        self.ensure_in_progress(OP)?;
        if self.awaiting_advance {
            return Err(SessionError::invalid_state(OP, "current question already answered"));
        }
        let chosen = OptionIndex::new(choice).map_err(|_| SessionError::InvalidOption(choice))?;

        let bank = Arc::clone(&self.bank);
        let question = self
            .current
            .and_then(|id| bank.get(id))
            .ok_or_else(|| SessionError::invalid_state(OP, "no question loaded"))?;

        let correct = question.is_correct(chosen);
        let points = if correct { self.difficulty.points() } else { 0 };
        self.score = self.score.saturating_add(points);
        self.difficulty = if correct {
            self.difficulty.raised()
        } else {
            self.difficulty.lowered()
        };

        self.history.push(AnsweredQuestion {
            question_id: question.id(),
            tier: question.tier(),
            chosen,
            correct,
            points,
            difficulty_after: self.difficulty,
        });
        self.awaiting_advance = true;

        debug!(
            session_id = %self.id,
            question_id = %question.id(),
            correct,
            points,
            difficulty = %self.difficulty,
            "answer recorded"
        );

        Ok(AnswerOutcome {
            question_id: question.id(),
            chosen,
            correct,
            correct_option: question.correct_option(),
            points,
            new_difficulty: self.difficulty,
            explanation: question.explanation().map(str::to_string),
        })
    }

    /// Move past the answered question and draw the next one.
    ///
    /// Returns `None` when the session completes, either because every
    /// question was answered or because the bank ran out of candidates.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is complete or the
    /// current question has not been answered.
    pub fn advance(&mut self) -> Result<Option<&Question>, SessionError> {
        const OP: &str = "advance";
        self.ensure_in_progress(OP)?;
        if !self.awaiting_advance {
            return Err(SessionError::invalid_state(OP, "current question has not been answered"));
        }
        self.awaiting_advance = false;
        self.current_index += 1;

        if self.current_index >= self.total_questions {
            self.complete(CompletionReason::AllAnswered);
            return Ok(None);
        }

        let next = select_next(&self.bank, self.difficulty, &self.used, &mut self.rng)
            .map(Question::id);
        match next {
            Some(id) => {
                self.used.insert(id);
                self.current = Some(id);
                Ok(self.current_question())
            }
            None => {
                warn!(
                    session_id = %self.id,
                    answered = self.history.len(),
                    total_questions = self.total_questions,
                    difficulty = %self.difficulty,
                    "question bank exhausted before session end"
                );
                self.complete(CompletionReason::Exhausted);
                Ok(None)
            }
        }
    }

    /// End the session because the caller's time budget ran out.
    ///
    /// Returns `false` if the session had already completed.
    pub fn expire(&mut self) -> bool {
        if self.is_complete() {
            return false;
        }
        self.complete(CompletionReason::Expired);
        true
    }

    /// Build the session report. Repeated calls return the same report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` while the session is in progress.
    pub fn finalize(&mut self) -> Result<SessionReport, SessionError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        let (Some(completion), Some(completed_at)) = (self.completion, self.completed_at) else {
            return Err(SessionError::invalid_state("finalize", "session is still in progress"));
        };

        let report = SessionReport::from_history(
            self.id,
            self.total_questions,
            self.difficulty,
            completion,
            self.history.clone(),
            &self.bank,
            self.started_at,
            completed_at,
        )?;
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Id under which the report was stored, once persisted.
    #[must_use]
    pub fn report_id(&self) -> Option<SessionId> {
        self.report_id
    }

    pub(crate) fn set_report_id(&mut self, id: SessionId) {
        self.report_id = Some(id);
    }

    fn ensure_in_progress(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Complete => {
                Err(SessionError::invalid_state(operation, "session is complete"))
            }
        }
    }

    fn complete(&mut self, reason: CompletionReason) {
        self.status = SessionStatus::Complete;
        self.completion = Some(reason);
        // a wall clock stepping backwards must not leave an unreportable session
        self.completed_at = Some(self.clock.now().max(self.started_at));
        self.current = None;
        self.awaiting_advance = false;
        info!(
            session_id = %self.id,
            reason = %reason,
            score = self.score,
            answered = self.history.len(),
            difficulty = %self.difficulty,
            "assessment complete"
        );
    }
}

impl fmt::Debug for AssessmentEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentEngine")
            .field("id", &self.id)
            .field("bank_len", &self.bank.len())
            .field("total_questions", &self.total_questions)
            .field("current", &self.current)
            .field("current_index", &self.current_index)
            .field("difficulty", &self.difficulty)
            .field("score", &self.score)
            .field("used_len", &self.used.len())
            .field("status", &self.status)
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
