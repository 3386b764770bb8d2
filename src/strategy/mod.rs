//! Strategy performance learning
//!
//! Tracks how well each remediation technique performs, classifies fix
//! failures into advisory suggestions, and summarises each learning session.

pub mod attempt;
pub mod failure;
pub mod insights;
pub mod technique;
pub mod tracker;

pub use attempt::{FixAttempt, FixDescriptor, FixResult, FixResults};
pub use failure::{classify_error, FailureCategory, StrategyImprovement};
pub use insights::{generate_insights, Insight, InsightKind, LearningReport};
pub use technique::{ProfileDefaults, Technique, UNKNOWN_TECHNIQUE_DEFAULTS};
pub use tracker::{ImprovementRecord, StrategyProfile, StrategyTracker, UpdateKind};
