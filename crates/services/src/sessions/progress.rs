use quiz_core::model::DifficultyLevel;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    /// 1-based number of the question on screen, `None` once complete.
    pub position: Option<usize>,
    pub remaining: usize,
    pub difficulty: DifficultyLevel,
    pub is_complete: bool,
}

impl SessionProgress {
    /// Percentage of the session's questions answered so far.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64 * 100.0
    }
}
