use thiserror::Error;

use crate::model::{
    BankError, DifficultyError, QuestionError, SessionReportError, SettingsError, TagError,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    Difficulty(#[from] DifficultyError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Report(#[from] SessionReportError),
}
