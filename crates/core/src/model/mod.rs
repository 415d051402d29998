mod bank;
mod difficulty;
mod ids;
mod question;
mod session;
mod settings;
mod tag;

pub use bank::{BankError, QuestionBank, TierCounts};
pub use difficulty::{DifficultyError, DifficultyLevel, DifficultyTier};
pub use ids::{ParseIdError, QuestionId, SessionId};
pub use question::{OptionIndex, Question, QuestionDraft, QuestionError, OPTION_COUNT};
pub use session::{
    AnsweredQuestion, CompletionReason, SessionReport, SessionReportError, SessionStatus,
    TagPerformance,
};
pub use settings::{AssessmentSettings, AssessmentSettingsDraft, SettingsError};
pub use tag::{TagError, TagName};
