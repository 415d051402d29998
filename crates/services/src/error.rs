//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{SessionReportError, SettingsError};
use storage::StorageError;

/// Errors emitted by assessment sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// No question could be drawn to begin the session.
    #[error("no questions available for session")]
    Empty,

    /// The operation is not legal in the session's current state.
    #[error("cannot {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: &'static str,
    },

    /// The chosen option is not one of A–D.
    #[error("option index must be between 0 and 3, got {0}")]
    InvalidOption(u8),

    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Report(#[from] SessionReportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SessionError {
    pub(crate) fn invalid_state(operation: &'static str, reason: &'static str) -> Self {
        Self::InvalidState { operation, reason }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
