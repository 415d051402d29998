#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use error::{AppServicesError, SessionError};

pub use sessions::{
    AdvanceResult, AnswerOutcome, AssessmentEngine, AssessmentLoopService, PerformanceOverview,
    ReportListItem, ReportService, SessionProgress, candidate_tiers, select_next,
};
