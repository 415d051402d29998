//! The question bank shipped with the binary.

use async_trait::async_trait;
use quiz_core::model::QuestionBank;

use crate::json::BankDocument;
use crate::repository::{QuestionSource, StorageError};

const BUILTIN_BANK_JSON: &str = include_str!("../data/math_basics.json");

/// Subject shared by every built-in question.
pub const BUILTIN_SUBJECT: &str = "Mathematics";

/// Parse the compiled-in bank (percentages and speed, all four tiers).
///
/// # Errors
///
/// Returns `StorageError` only if the embedded document is malformed.
pub fn builtin_bank() -> Result<QuestionBank, StorageError> {
    BankDocument::parse(BUILTIN_BANK_JSON)?.into_bank()
}

/// `QuestionSource` over the compiled-in bank.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinBank;

#[async_trait]
impl QuestionSource for BuiltinBank {
    async fn load_bank(&self) -> Result<QuestionBank, StorageError> {
        builtin_bank()
    }
}
