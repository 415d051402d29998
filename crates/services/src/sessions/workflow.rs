use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use quiz_core::model::{AssessmentSettings, Question, QuestionBank, QuestionId, SessionId};
use storage::repository::{QuestionSource, ReportRepository, StorageError};

use super::service::{AnswerOutcome, AssessmentEngine};
use crate::Clock;
use crate::error::SessionError;

/// Result of moving past an answered question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceResult {
    pub next: Option<QuestionId>,
    pub is_complete: bool,
    pub report_id: Option<SessionId>,
}

/// Orchestrates session start and report persistence around the engine.
#[derive(Clone)]
pub struct AssessmentLoopService {
    clock: Clock,
    settings: AssessmentSettings,
    questions: Arc<dyn QuestionSource>,
    reports: Arc<dyn ReportRepository>,
    bank: Arc<Mutex<Option<Arc<QuestionBank>>>>,
}

impl AssessmentLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: AssessmentSettings,
        questions: Arc<dyn QuestionSource>,
        reports: Arc<dyn ReportRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            questions,
            reports,
            bank: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &AssessmentSettings {
        &self.settings
    }

    /// The question bank, loaded from the source on first use and then shared.
    ///
    /// When the settings name topics, only questions matching them are kept.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the bank cannot be loaded.
    pub async fn bank(&self) -> Result<Arc<QuestionBank>, SessionError> {
        if let Some(bank) = self.cached_bank()? {
            return Ok(bank);
        }
        let mut loaded = self.questions.load_bank().await?;
        let topics = self.settings.topics();
        if !topics.is_empty() {
            let available = loaded.len();
            loaded = loaded.restricted_to(topics);
            debug!(?topics, available, kept = loaded.len(), "bank restricted to topics");
        }
        info!(questions = loaded.len(), "question bank loaded");
        let loaded = Arc::new(loaded);

        let mut guard = self
            .bank
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // another caller may have finished loading first
        Ok(Arc::clone(guard.get_or_insert(loaded)))
    }

    /// Start a new assessment over the shared bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the bank cannot be loaded, or
    /// `SessionError::Empty` if it has nothing to draw.
    pub async fn start_assessment(&self) -> Result<AssessmentEngine, SessionError> {
        let bank = self.bank().await?;
        AssessmentEngine::start(bank, &self.settings, self.clock)
    }

    /// Start a reproducible assessment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start_assessment`].
    pub async fn start_assessment_with_seed(
        &self,
        seed: u64,
    ) -> Result<AssessmentEngine, SessionError> {
        let bank = self.bank().await?;
        debug!(seed, "starting seeded assessment");
        AssessmentEngine::start_seeded(bank, &self.settings, self.clock, seed)
    }

    /// Answer the current question.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError::InvalidOption` and `SessionError::InvalidState`.
    pub fn answer_current(
        &self,
        engine: &mut AssessmentEngine,
        choice: u8,
    ) -> Result<AnswerOutcome, SessionError> {
        engine.record_answer(choice)
    }

    /// Advance to the next question, storing the report if the session ends.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` for an out-of-order call, or
    /// `SessionError::Storage` if persisting the report fails.
    pub async fn advance(
        &self,
        engine: &mut AssessmentEngine,
    ) -> Result<AdvanceResult, SessionError> {
        let next = engine.advance()?.map(Question::id);
        if engine.is_complete() {
            self.finalize_report(engine).await?;
        }
        Ok(AdvanceResult {
            next,
            is_complete: engine.is_complete(),
            report_id: engine.report_id(),
        })
    }

    /// End the session on timeout and store its report.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if persisting the report fails.
    pub async fn expire(&self, engine: &mut AssessmentEngine) -> Result<SessionId, SessionError> {
        if engine.expire() {
            info!(session_id = %engine.id(), "assessment expired");
        }
        self.finalize_report(engine).await
    }

    /// Store the report of a completed session, once.
    ///
    /// Returns the existing id when the report was already stored, so a
    /// failed append can simply be retried.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` if the session is still running,
    /// or `SessionError::Storage` if persistence fails.
    pub async fn finalize_report(
        &self,
        engine: &mut AssessmentEngine,
    ) -> Result<SessionId, SessionError> {
        if let Some(id) = engine.report_id() {
            return Ok(id);
        }
        let report = engine.finalize()?;
        let id = self.reports.append_report(&report).await?;
        engine.set_report_id(id);
        debug!(session_id = %id, score = report.final_score(), "report stored");
        Ok(id)
    }

    fn cached_bank(&self) -> Result<Option<Arc<QuestionBank>>, StorageError> {
        let guard = self
            .bank
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.as_ref().map(Arc::clone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use quiz_core::model::{DifficultyTier, QuestionDraft};
    use quiz_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn bank() -> QuestionBank {
        let drafts = DifficultyTier::ALL.iter().enumerate().flat_map(|(t, &tier)| {
            (1..=3).map(move |i| QuestionDraft {
                id: (t * 3 + i) as u64,
                text: format!("Q{t}-{i}"),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_option: 0,
                tier,
                tags: vec!["retention".into()],
                subject: None,
                hint: None,
                explanation: None,
            })
        });
        QuestionBank::from_drafts(drafts).unwrap()
    }

    fn service(repo: &InMemoryRepository, total: u32) -> AssessmentLoopService {
        AssessmentLoopService::new(
            fixed_clock(),
            AssessmentSettings::untimed(total).unwrap(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    struct CountingSource {
        inner: InMemoryRepository,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl QuestionSource for CountingSource {
        async fn load_bank(&self) -> Result<QuestionBank, StorageError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load_bank().await
        }
    }

    #[tokio::test]
    async fn completed_session_stores_its_report_once() {
        let repo = InMemoryRepository::with_bank(bank());
        let svc = service(&repo, 3);
        let mut engine = svc.start_assessment_with_seed(1).await.unwrap();

        let mut last = None;
        while !engine.is_complete() {
            svc.answer_current(&mut engine, 0).unwrap();
            last = Some(svc.advance(&mut engine).await.unwrap());
        }
        let last = last.unwrap();
        assert!(last.is_complete);
        assert!(last.next.is_none());
        let id = last.report_id.unwrap();
        assert_eq!(id, engine.id());

        let again = svc.finalize_report(&mut engine).await.unwrap();
        assert_eq!(again, id);
        let stored = repo.list_reports(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].questions_completed(), 3);
    }

    #[tokio::test]
    async fn advance_mid_session_reports_next_question() {
        let repo = InMemoryRepository::with_bank(bank());
        let svc = service(&repo, 5);
        let mut engine = svc.start_assessment_with_seed(2).await.unwrap();
        svc.answer_current(&mut engine, 0).unwrap();
        let result = svc.advance(&mut engine).await.unwrap();
        assert!(!result.is_complete);
        assert_eq!(result.next, engine.current_question().map(Question::id));
        assert!(result.report_id.is_none());
    }

    #[tokio::test]
    async fn expire_persists_partial_report() {
        let repo = InMemoryRepository::with_bank(bank());
        let svc = service(&repo, 5);
        let mut engine = svc.start_assessment().await.unwrap();
        svc.answer_current(&mut engine, 1).unwrap();

        let id = svc.expire(&mut engine).await.unwrap();
        let report = repo.get_report(id).await.unwrap();
        assert_eq!(report.questions_completed(), 1);
        assert_eq!(report.final_score(), 0);

        // a second expiry is a no-op returning the same report
        assert_eq!(svc.expire(&mut engine).await.unwrap(), id);
    }

    #[tokio::test]
    async fn finalize_report_rejects_running_session() {
        let repo = InMemoryRepository::with_bank(bank());
        let svc = service(&repo, 5);
        let mut engine = svc.start_assessment_with_seed(3).await.unwrap();
        let err = svc.finalize_report(&mut engine).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert!(repo.list_reports(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_bank_cannot_start() {
        let repo = InMemoryRepository::new();
        let err = service(&repo, 5).start_assessment().await.unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn topics_restrict_the_drawn_questions() {
        let mut drafts: Vec<QuestionDraft> = bank().iter().map(QuestionDraft::from).collect();
        for draft in drafts.iter_mut().filter(|d| d.id % 2 == 0) {
            draft.tags.push("speed".into());
        }
        let repo = InMemoryRepository::with_bank(QuestionBank::from_drafts(drafts).unwrap());
        let settings = quiz_core::model::AssessmentSettingsDraft {
            total_questions: Some(12),
            time_limit_secs: Some(0),
            topics: vec!["Speed".into()],
            ..Default::default()
        }
        .validate()
        .unwrap();
        let svc = AssessmentLoopService::new(
            fixed_clock(),
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        assert_eq!(svc.bank().await.unwrap().len(), 6);

        let mut engine = svc.start_assessment_with_seed(4).await.unwrap();
        while let Some(question) = engine.current_question() {
            assert_eq!(question.id().value() % 2, 0);
            svc.answer_current(&mut engine, 1).unwrap();
            svc.advance(&mut engine).await.unwrap();
        }
        assert!(engine.history().len() <= 6);
    }

    #[tokio::test]
    async fn unmatched_topic_leaves_nothing_to_start() {
        let repo = InMemoryRepository::with_bank(bank());
        let settings = quiz_core::model::AssessmentSettingsDraft {
            topics: vec!["chemistry".into()],
            ..Default::default()
        }
        .validate()
        .unwrap();
        let svc = AssessmentLoopService::new(
            fixed_clock(),
            settings,
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let err = svc.start_assessment().await.unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[tokio::test]
    async fn bank_is_loaded_once() {
        let source = Arc::new(CountingSource {
            inner: InMemoryRepository::with_bank(bank()),
            loads: AtomicUsize::new(0),
        });
        let svc = AssessmentLoopService::new(
            fixed_clock(),
            AssessmentSettings::default(),
            Arc::clone(&source) as Arc<dyn QuestionSource>,
            Arc::new(InMemoryRepository::new()),
        );
        let first = svc.start_assessment_with_seed(1).await.unwrap();
        let second = svc.start_assessment_with_seed(2).await.unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);
    }
}
