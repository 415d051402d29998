use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validated tag name (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TagError::EmptyName` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TagError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TagName> for String {
    fn from(tag: TagName) -> Self {
        tag.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TagError {
    #[error("tag name cannot be empty")]
    EmptyName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_is_trimmed() {
        let tag = TagName::new("  retention ").unwrap();
        assert_eq!(tag.as_str(), "retention");
    }

    #[test]
    fn blank_tag_is_rejected() {
        assert_eq!(TagName::new("   "), Err(TagError::EmptyName));
        assert!(serde_json::from_str::<TagName>("\"\"").is_err());
    }
}
