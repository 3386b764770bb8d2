//! Remediation Engine - Adaptive Remediation Learning Library
//!
//! An engine that learns from its own remediation runs:
//! - Logistic-regression violation forecasting from artifact metadata
//! - A six-phase detect → diagnose → decide → deploy → verify → learn loop
//!   around externally supplied detector, planner, and executor
//! - Per-technique success tracking with incremental and recomputed updates
//! - SQLite persistence of the corpus, model, attempt log, and profiles
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use remediation_engine::{EngineConfig, EngineState, RemediationOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = Arc::new(EngineState::open(EngineConfig::load()?).await?);
//!     let orchestrator = RemediationOrchestrator::new(state, detector, planner, executor);
//!     let report = orchestrator.remediate_document("brochure.indd".as_ref()).await?;
//!     println!("{:.1}% improvement", report.improvement);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod config;
pub mod error;
pub mod prediction;
pub mod strategy;
pub mod storage;
pub mod engine;
pub mod orchestrator;
pub mod cli;

// Re-export commonly used types for convenience
pub use config::EngineConfig;
pub use engine::{EngineState, LearningStatistics, ModelStatistics};
pub use error::{EngineError, EngineResult, Phase};
pub use orchestrator::{
    Detector, ExecutionReport, Executor, FixPlan, Planner, RemediationOrchestrator, RemediationReport,
};
pub use prediction::{ArtifactMetadata, ViolationForecast};
pub use storage::EngineStore;
pub use strategy::{FixDescriptor, FixResult, FixResults, LearningReport, Technique};
pub use types::{DetectionReport, Severity, Violation, ViolationSet};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
