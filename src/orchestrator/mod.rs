//! Remediation orchestration
//!
//! The six-phase loop, its collaborator contracts, and the internal
//! diagnose/verify/metrics steps.

pub mod collaborators;
pub mod diagnosis;
pub mod metrics;
pub mod pipeline;
pub mod verify;

// Re-export commonly used types
pub use collaborators::{Detector, ExecutionReport, ExecutionStats, Executor, FixPlan, Planner};
pub use diagnosis::{diagnose, CategoryIssue, Diagnosis, IssueKind, Recommendation};
pub use metrics::{improvement_percent, mean_time_to_resolution, PhaseTiming, RunMetrics};
pub use pipeline::{RemediationLoop, RemediationOrchestrator, RemediationReport};
pub use verify::{verify, VerificationResult};
