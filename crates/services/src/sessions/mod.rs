mod plan;
mod progress;
mod queries;
mod service;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{candidate_tiers, select_next};
pub use progress::SessionProgress;
pub use service::{AnswerOutcome, AssessmentEngine};
pub use view::{PerformanceOverview, ReportListItem, ReportService};
pub use workflow::{AdvanceResult, AssessmentLoopService};
