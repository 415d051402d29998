use std::sync::Arc;
use tracing::info;

use quiz_core::model::{AssessmentSettings, QuestionBank};
use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::sessions::{AssessmentLoopService, ReportService};

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    assessments: Arc<AssessmentLoopService>,
    reports: Arc<ReportService>,
}

impl AppServices {
    /// Build services and load the question bank up front, so a broken
    /// bank is reported before any session starts.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank cannot be loaded.
    pub async fn new(
        storage: Storage,
        settings: AssessmentSettings,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let assessments = Arc::new(AssessmentLoopService::new(
            clock,
            settings,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.reports),
        ));
        let bank = assessments.bank().await?;
        info!(
            questions = bank.len(),
            total_questions = assessments.settings().total_questions(),
            "app services ready"
        );
        let reports = Arc::new(ReportService::new(Arc::clone(&storage.reports)));
        Ok(Self {
            assessments,
            reports,
        })
    }

    /// Services over the compiled-in bank.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the built-in bank fails to parse.
    pub async fn builtin(settings: AssessmentSettings, clock: Clock) -> Result<Self, AppServicesError> {
        Self::new(Storage::builtin(), settings, clock).await
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentLoopService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn reports(&self) -> Arc<ReportService> {
        Arc::clone(&self.reports)
    }

    /// The loaded question bank.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the bank cannot be loaded.
    pub async fn bank(&self) -> Result<Arc<QuestionBank>, AppServicesError> {
        Ok(self.assessments.bank().await?)
    }
}
