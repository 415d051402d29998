use async_trait::async_trait;
use quiz_core::model::{BankError, QuestionBank, SessionId, SessionReport};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::builtin::BuiltinBank;
use crate::json::JsonBankFile;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported bank format version {0}")]
    UnsupportedVersion(u32),

    #[error(transparent)]
    InvalidBank(#[from] BankError),
}

/// Source of the question bank a session draws from.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Load and validate the full bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be read or fails validation.
    async fn load_bank(&self) -> Result<QuestionBank, StorageError>;
}

/// Repository contract for completed session reports.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Store a report under its session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if a report for the session already exists.
    async fn append_report(&self, report: &SessionReport) -> Result<SessionId, StorageError>;

    /// Fetch a report by session id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_report(&self, id: SessionId) -> Result<SessionReport, StorageError>;

    /// List up to `limit` reports, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_reports(&self, limit: u32) -> Result<Vec<SessionReport>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    bank: Arc<QuestionBank>,
    reports: Arc<Mutex<Vec<SessionReport>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_bank(bank: QuestionBank) -> Self {
        Self {
            bank: Arc::new(bank),
            reports: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QuestionSource for InMemoryRepository {
    async fn load_bank(&self) -> Result<QuestionBank, StorageError> {
        Ok(self.bank.as_ref().clone())
    }
}

#[async_trait]
impl ReportRepository for InMemoryRepository {
    async fn append_report(&self, report: &SessionReport) -> Result<SessionId, StorageError> {
        let mut guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = report.session_id();
        if guard.iter().any(|r| r.session_id() == id) {
            return Err(StorageError::Conflict);
        }
        guard.push(report.clone());
        Ok(id)
    }

    async fn get_report(&self, id: SessionId) -> Result<SessionReport, StorageError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|r| r.session_id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_reports(&self, limit: u32) -> Result<Vec<SessionReport>, StorageError> {
        let guard = self
            .reports
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut reports = guard.clone();
        // Stable sort keeps insertion order for reports completed at the same instant.
        reports.sort_by(|a, b| b.completed_at().cmp(&a.completed_at()));
        reports.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(reports)
    }
}

/// Aggregates the question source and report repository behind trait objects.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionSource>,
    pub reports: Arc<dyn ReportRepository>,
}

impl Storage {
    /// Questions and reports both held in memory.
    #[must_use]
    pub fn in_memory(bank: QuestionBank) -> Self {
        let repo = InMemoryRepository::with_bank(bank);
        let questions: Arc<dyn QuestionSource> = Arc::new(repo.clone());
        let reports: Arc<dyn ReportRepository> = Arc::new(repo);
        Self { questions, reports }
    }

    /// The compiled-in bank with an in-memory report store.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            questions: Arc::new(BuiltinBank),
            reports: Arc::new(InMemoryRepository::new()),
        }
    }

    /// Questions read from a JSON bank document with an in-memory report store.
    #[must_use]
    pub fn json_file(path: impl Into<PathBuf>) -> Self {
        Self {
            questions: Arc::new(JsonBankFile::new(path)),
            reports: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{
        AnsweredQuestion, CompletionReason, DifficultyLevel, DifficultyTier, OptionIndex,
        QuestionDraft, QuestionId,
    };
    use quiz_core::time::fixed_now;

    fn bank() -> QuestionBank {
        QuestionBank::from_drafts(vec![QuestionDraft {
            id: 1,
            text: "Q".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: 0,
            tier: DifficultyTier::Moderate,
            tags: vec!["grasping".into()],
            subject: None,
            hint: None,
            explanation: None,
        }])
        .unwrap()
    }

    fn report(minutes: i64) -> SessionReport {
        let at = fixed_now() + chrono::Duration::minutes(minutes);
        SessionReport::from_history(
            SessionId::new(),
            1,
            DifficultyLevel::MAX,
            CompletionReason::AllAnswered,
            vec![AnsweredQuestion {
                question_id: QuestionId::new(1),
                tier: DifficultyTier::Moderate,
                chosen: OptionIndex::new(0).unwrap(),
                correct: true,
                points: 3,
                difficulty_after: DifficultyLevel::MAX,
            }],
            &bank(),
            fixed_now(),
            at,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn in_memory_serves_its_bank() {
        let repo = InMemoryRepository::with_bank(bank());
        let loaded = repo.load_bank().await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn append_then_get_round_trips_and_rejects_duplicates() {
        let repo = InMemoryRepository::new();
        let r = report(1);
        let id = repo.append_report(&r).await.unwrap();
        assert_eq!(repo.get_report(id).await.unwrap(), r);
        assert!(matches!(
            repo.append_report(&r).await,
            Err(StorageError::Conflict)
        ));
        assert!(matches!(
            repo.get_report(SessionId::new()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_reports_is_newest_first_and_limited() {
        let repo = InMemoryRepository::new();
        let older = report(1);
        let newer = report(5);
        repo.append_report(&older).await.unwrap();
        repo.append_report(&newer).await.unwrap();

        let listed = repo.list_reports(10).await.unwrap();
        assert_eq!(listed[0].session_id(), newer.session_id());
        assert_eq!(listed[1].session_id(), older.session_id());

        let limited = repo.list_reports(1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }
}
