use async_trait::async_trait;
use quiz_core::model::QuestionBank;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::document::BankDocument;
use crate::repository::{QuestionSource, StorageError};

/// A bank document on disk, re-read on every load.
#[derive(Debug, Clone)]
pub struct JsonBankFile {
    path: PathBuf,
}

impl JsonBankFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `bank` to this file as a pretty-printed document, creating parent
    /// directories as needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be written.
    pub async fn write_bank(
        &self,
        subject: Option<String>,
        bank: &QuestionBank,
    ) -> Result<(), StorageError> {
        let json = BankDocument::from_bank(subject, bank).to_json_pretty()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl QuestionSource for JsonBankFile {
    async fn load_bank(&self) -> Result<QuestionBank, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "bank file not found");
                return Err(StorageError::NotFound);
            }
            Err(source) => return Err(self.io_error(source)),
        };
        let bank = BankDocument::parse(&raw)?.into_bank()?;
        debug!(path = %self.path.display(), questions = bank.len(), "bank file loaded");
        Ok(bank)
    }
}
