use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

use crate::model::difficulty::{DifficultyError, DifficultyLevel};
use crate::model::tag::{TagError, TagName};

/// Questions per session when nothing else is configured.
pub const DEFAULT_TOTAL_QUESTIONS: u32 = 10;
/// Five minutes, matching the timed assessment screen.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 300;
/// How long the presentation layer shows an answer's result before advancing.
pub const DEFAULT_RESULT_DELAY_MS: u64 = 1_500;

const MAX_TOTAL_QUESTIONS: u32 = 1_000;
const MAX_TIME_LIMIT_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per session must be between 1 and 1000, got {0}")]
    InvalidQuestionCount(u32),

    #[error("time limit must be at most 86400 seconds, got {0}")]
    InvalidTimeLimit(u64),

    #[error("invalid starting level: {0}")]
    StartingLevel(#[from] DifficultyError),

    #[error("invalid topic: {0}")]
    Topic(#[from] TagError),
}

/// Validated configuration for one assessment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentSettings {
    total_questions: u32,
    time_limit: Option<Duration>,
    result_delay: Duration,
    starting_difficulty: DifficultyLevel,
    topics: BTreeSet<TagName>,
}

/// Raw settings as collected from env vars or flags; `None` means "use the default".
#[derive(Debug, Clone, Default)]
pub struct AssessmentSettingsDraft {
    pub total_questions: Option<u32>,
    /// `Some(0)` disables the time limit.
    pub time_limit_secs: Option<u64>,
    pub result_delay_ms: Option<u64>,
    /// Ladder level of the first question, 1..=4.
    pub starting_level: Option<u8>,
    /// Subjects or tags to practise; empty means the whole bank.
    pub topics: Vec<String>,
}

impl AssessmentSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for a zero or oversized question count, a
    /// time limit longer than a day, a level off the ladder, or a blank topic.
    pub fn validate(self) -> Result<AssessmentSettings, SettingsError> {
        let total_questions = self.total_questions.unwrap_or(DEFAULT_TOTAL_QUESTIONS);
        if total_questions == 0 || total_questions > MAX_TOTAL_QUESTIONS {
            return Err(SettingsError::InvalidQuestionCount(total_questions));
        }

        let time_limit = match self.time_limit_secs.unwrap_or(DEFAULT_TIME_LIMIT_SECS) {
            0 => None,
            secs if secs > MAX_TIME_LIMIT_SECS => {
                return Err(SettingsError::InvalidTimeLimit(secs));
            }
            secs => Some(Duration::from_secs(secs)),
        };

        let result_delay =
            Duration::from_millis(self.result_delay_ms.unwrap_or(DEFAULT_RESULT_DELAY_MS));

        let starting_difficulty = match self.starting_level {
            Some(level) => DifficultyLevel::new(level)?,
            None => DifficultyLevel::STARTING,
        };
        let topics = self
            .topics
            .into_iter()
            .map(TagName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;

        Ok(AssessmentSettings {
            total_questions,
            time_limit,
            result_delay,
            starting_difficulty,
            topics,
        })
    }
}

impl AssessmentSettings {
    /// Settings for a fixed-length, untimed session.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidQuestionCount` when `total_questions` is out of range.
    pub fn untimed(total_questions: u32) -> Result<Self, SettingsError> {
        AssessmentSettingsDraft {
            total_questions: Some(total_questions),
            time_limit_secs: Some(0),
            result_delay_ms: Some(0),
            ..AssessmentSettingsDraft::default()
        }
        .validate()
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        usize::try_from(self.total_questions).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    #[must_use]
    pub fn result_delay(&self) -> Duration {
        self.result_delay
    }

    #[must_use]
    pub fn starting_difficulty(&self) -> DifficultyLevel {
        self.starting_difficulty
    }

    #[must_use]
    pub fn topics(&self) -> &BTreeSet<TagName> {
        &self.topics
    }
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            total_questions: DEFAULT_TOTAL_QUESTIONS,
            time_limit: Some(Duration::from_secs(DEFAULT_TIME_LIMIT_SECS)),
            result_delay: Duration::from_millis(DEFAULT_RESULT_DELAY_MS),
            starting_difficulty: DifficultyLevel::STARTING,
            topics: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = AssessmentSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, AssessmentSettings::default());
        assert_eq!(settings.total_questions(), 10);
        assert_eq!(settings.time_limit(), Some(Duration::from_secs(300)));
        assert_eq!(settings.starting_difficulty(), DifficultyLevel::STARTING);
        assert!(settings.topics().is_empty());
    }

    #[test]
    fn practice_choices_are_validated() {
        let settings = AssessmentSettingsDraft {
            starting_level: Some(1),
            topics: vec![" Speed ".into(), "Percentages".into()],
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.starting_difficulty().value(), 1);
        let topics: Vec<_> = settings.topics().iter().map(TagName::as_str).collect();
        assert_eq!(topics, vec!["Percentages", "Speed"]);

        let err = AssessmentSettingsDraft {
            starting_level: Some(5),
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, SettingsError::StartingLevel(_)));

        let err = AssessmentSettingsDraft {
            topics: vec!["  ".into()],
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, SettingsError::Topic(TagError::EmptyName));
    }

    #[test]
    fn zero_time_limit_means_untimed() {
        let settings = AssessmentSettingsDraft {
            time_limit_secs: Some(0),
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.time_limit(), None);
    }

    #[test]
    fn rejects_zero_questions_and_huge_limits() {
        assert_eq!(
            AssessmentSettings::untimed(0),
            Err(SettingsError::InvalidQuestionCount(0))
        );
        let err = AssessmentSettingsDraft {
            time_limit_secs: Some(100_000),
            ..AssessmentSettingsDraft::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, SettingsError::InvalidTimeLimit(100_000));
    }
}
