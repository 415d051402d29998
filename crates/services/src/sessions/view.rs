use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use quiz_core::model::{
    CompletionReason, DifficultyTier, SessionId, SessionReport, TagPerformance,
};
use storage::repository::{InMemoryRepository, ReportRepository};

use super::queries;
use crate::error::SessionError;

/// Presentation-agnostic list item for a stored report.
///
/// No pre-formatted strings; the UI formats percentages and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportListItem {
    pub id: SessionId,
    pub completed_at: DateTime<Utc>,
    pub completion: CompletionReason,
    pub final_score: u32,
    pub score_percent: u32,
    pub accuracy_percent: u32,
    pub questions_completed: u32,
    pub total_questions: u32,
    pub final_tier: DifficultyTier,
}

impl ReportListItem {
    #[must_use]
    pub fn from_report(report: &SessionReport) -> Self {
        Self {
            id: report.session_id(),
            completed_at: report.completed_at(),
            completion: report.completion(),
            final_score: report.final_score(),
            score_percent: report.score_percent(),
            accuracy_percent: report.accuracy_percent(),
            questions_completed: report.questions_completed(),
            total_questions: report.total_questions(),
            final_tier: report.final_difficulty_tier(),
        }
    }
}

/// Totals across stored reports, for an analytics screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PerformanceOverview {
    pub sessions: u32,
    pub average_score_percent: u32,
    pub average_accuracy_percent: u32,
    pub best_score: u32,
    pub questions_answered: u32,
    /// Per-tag accuracy merged across sessions, sorted by tag.
    pub tag_breakdown: Vec<TagPerformance>,
}

/// Read-side facade over stored session reports.
#[derive(Clone)]
pub struct ReportService {
    reports: Arc<dyn ReportRepository>,
}

impl ReportService {
    #[must_use]
    pub fn new(reports: Arc<dyn ReportRepository>) -> Self {
        Self { reports }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRepository::new()))
    }

    /// Fetch a report by session id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the report is missing or storage fails.
    pub async fn get_report(&self, id: SessionId) -> Result<SessionReport, SessionError> {
        Ok(self.reports.get_report(id).await?)
    }

    /// Most recently completed reports first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<ReportListItem>, SessionError> {
        let reports = self.reports.list_reports(limit).await?;
        Ok(reports.iter().map(ReportListItem::from_report).collect())
    }

    /// Aggregate the `limit` most recent reports.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn overview(&self, limit: u32) -> Result<PerformanceOverview, SessionError> {
        let reports = self.reports.list_reports(limit).await?;
        Ok(queries::overview(&reports))
    }
}
