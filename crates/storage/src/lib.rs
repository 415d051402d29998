#![forbid(unsafe_code)]

pub mod builtin;
pub mod json;
pub mod repository;

pub use repository::{
    InMemoryRepository, QuestionSource, ReportRepository, Storage, StorageError,
};
