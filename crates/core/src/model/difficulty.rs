use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DifficultyError {
    #[error("difficulty level must be between 1 and 4, got {0}")]
    OutOfRange(u8),

    #[error("unknown difficulty tier: {0:?}")]
    UnknownTier(String),
}

//
// ─── DIFFICULTY TIER ──────────────────────────────────────────────────────────
//

/// Four ordered buckets every question is tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    VeryEasy,
    Easy,
    Moderate,
    Difficult,
}

impl DifficultyTier {
    /// All tiers, easiest first.
    pub const ALL: [DifficultyTier; 4] = [
        DifficultyTier::VeryEasy,
        DifficultyTier::Easy,
        DifficultyTier::Moderate,
        DifficultyTier::Difficult,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DifficultyTier::VeryEasy => "Very easy",
            DifficultyTier::Easy => "Easy",
            DifficultyTier::Moderate => "Moderate",
            DifficultyTier::Difficult => "Difficult",
        }
    }

    #[must_use]
    pub fn level(self) -> DifficultyLevel {
        DifficultyLevel::from(self)
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DifficultyTier {
    type Err = DifficultyError;

    /// Accepts display labels ("Very easy") and snake case ("very_easy").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "very_easy" => Ok(DifficultyTier::VeryEasy),
            "easy" => Ok(DifficultyTier::Easy),
            "moderate" => Ok(DifficultyTier::Moderate),
            "difficult" => Ok(DifficultyTier::Difficult),
            _ => Err(DifficultyError::UnknownTier(s.to_string())),
        }
    }
}

//
// ─── DIFFICULTY LEVEL ─────────────────────────────────────────────────────────
//

/// A learner's position on the 1..=4 difficulty ladder.
///
/// The value can only be produced through the checked constructor or the
/// clamped `raised`/`lowered` steps, so it never leaves the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DifficultyLevel(u8);

impl DifficultyLevel {
    pub const MIN: DifficultyLevel = DifficultyLevel(1);
    pub const MAX: DifficultyLevel = DifficultyLevel(4);
    /// Where every session starts ("moderate-leaning").
    pub const STARTING: DifficultyLevel = DifficultyLevel(3);

    /// # Errors
    ///
    /// Returns `DifficultyError::OutOfRange` if `value` is not in 1..=4.
    pub fn new(value: u8) -> Result<Self, DifficultyError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(DifficultyError::OutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// One step harder, saturating at the top of the ladder.
    #[must_use]
    pub fn raised(self) -> Self {
        Self(self.0.saturating_add(1).min(Self::MAX.0))
    }

    /// One step easier, saturating at the bottom of the ladder.
    #[must_use]
    pub fn lowered(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN.0))
    }

    #[must_use]
    pub fn tier(self) -> DifficultyTier {
        match self.0 {
            1 => DifficultyTier::VeryEasy,
            2 => DifficultyTier::Easy,
            3 => DifficultyTier::Moderate,
            _ => DifficultyTier::Difficult,
        }
    }

    /// Points awarded for a correct answer at this level.
    #[must_use]
    pub fn points(self) -> u32 {
        u32::from(self.0).max(1)
    }
}

impl Default for DifficultyLevel {
    fn default() -> Self {
        Self::STARTING
    }
}

impl From<DifficultyTier> for DifficultyLevel {
    fn from(tier: DifficultyTier) -> Self {
        match tier {
            DifficultyTier::VeryEasy => Self(1),
            DifficultyTier::Easy => Self(2),
            DifficultyTier::Moderate => Self(3),
            DifficultyTier::Difficult => Self(4),
        }
    }
}

impl TryFrom<u8> for DifficultyLevel {
    type Error = DifficultyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.0
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX.0)
    }
}
