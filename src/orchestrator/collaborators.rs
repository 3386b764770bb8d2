//! External collaborator contracts
//!
//! Detection, planning, and execution are owned by embedding code. The
//! engine only sequences them and learns from what they report.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::prediction::ArtifactMetadata;
use crate::strategy::{FixDescriptor, FixResults};
use crate::types::DetectionReport;

/// Planned fixes, passed through to the executor unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixPlan {
    pub fixes: Vec<FixDescriptor>,
    /// Planner-specific data
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub fixes_successful: usize,
}

/// Output of `Executor::execute_fix_plan`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub results: FixResults,
    pub stats: ExecutionStats,
}

impl ExecutionReport {
    pub fn new(results: FixResults) -> Self {
        let fixes_successful = results.success.len();
        Self {
            results,
            stats: ExecutionStats { fixes_successful },
        }
    }
}

/// Inspects an artifact for violations
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Detector: Send + Sync {
    async fn detect_all(&self, artifact: &Path) -> Result<DetectionReport>;

    /// Pre-inspection summary used for prediction and the training corpus
    async fn describe(&self, artifact: &Path) -> Result<ArtifactMetadata> {
        Ok(ArtifactMetadata::new(artifact.display().to_string()))
    }
}

/// Turns detected violations into a fix plan
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Planner: Send + Sync {
    async fn generate_fix_plan(&self, artifact: &Path, detection: &DetectionReport) -> Result<FixPlan>;
}

/// Applies a fix plan
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Executor: Send + Sync {
    async fn execute_fix_plan(&self, plan: &FixPlan) -> Result<ExecutionReport>;
}
