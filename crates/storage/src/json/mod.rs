//! JSON bank documents: the on-disk format for question banks.

mod document;
mod file;

pub use document::{BANK_FORMAT_VERSION, BankDocument};
pub use file::JsonBankFile;
