//! Six-phase remediation loop
//!
//! Predict (optional) → Detect → Diagnose → Decide → Deploy → Verify →
//! Learn (optional). Phases run strictly in order. A collaborator failure
//! aborts the run before anything is committed; all writes happen in Learn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::collaborators::{Detector, Executor, ExecutionReport, FixPlan, Planner};
use super::diagnosis::{diagnose, Diagnosis};
use super::metrics::{PhaseTiming, RunMetrics};
use super::verify::{verify, VerificationResult};
use crate::engine::EngineState;
use crate::error::{EngineError, EngineResult, Phase};
use crate::prediction::{ArtifactMetadata, TrainingOutcome, ViolationForecast};
use crate::storage::{DocumentRecord, PredictionRecord};
use crate::strategy::LearningReport;
use crate::types::DetectionReport;

/// Per-phase results of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationLoop {
    pub prediction: Option<ViolationForecast>,
    pub detection: DetectionReport,
    pub diagnosis: Diagnosis,
    pub plan: FixPlan,
    pub execution: ExecutionReport,
    pub verification: VerificationResult,
    pub learning: Option<LearningReport>,
    pub retraining: Option<TrainingOutcome>,
}

/// Read-only report of a finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationReport {
    pub run_id: String,
    pub document_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "loop")]
    pub phases: RemediationLoop,
    pub metrics: RunMetrics,
    /// No regressions and no more violations than before
    pub success: bool,
    /// Improvement percentage
    pub improvement: f64,
}

/// Sequences the collaborators around shared engine state
pub struct RemediationOrchestrator {
    state: Arc<EngineState>,
    detector: Arc<dyn Detector>,
    planner: Arc<dyn Planner>,
    executor: Arc<dyn Executor>,
}

impl RemediationOrchestrator {
    pub fn new(
        state: Arc<EngineState>,
        detector: Arc<dyn Detector>,
        planner: Arc<dyn Planner>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            state,
            detector,
            planner,
            executor,
        }
    }

    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }

    async fn describe(&self, artifact: &Path, phase: Phase) -> EngineResult<ArtifactMetadata> {
        self.detector
            .describe(artifact)
            .await
            .map_err(|e| EngineError::collaborator(phase, e))
    }

    /// Run the full loop against one artifact.
    ///
    /// Holds the engine's run lock for the whole run, so concurrent runs and
    /// `learn_from_fixes` calls are serialised.
    pub async fn remediate_document(&self, artifact: &Path) -> EngineResult<RemediationReport> {
        let _guard = self.state.lock_run().await;
        let pipeline = self.state.config().pipeline.clone();
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let run_start = Instant::now();
        let mut timings = Vec::new();
        let mut document_id = artifact.display().to_string();
        info!("Starting remediation run {} for {}", run_id, artifact.display());

        // Predict
        let mut metadata = None;
        let prediction = if pipeline.enable_prediction {
            let t = Instant::now();
            let described = self.describe(artifact, Phase::Predict).await?;
            let forecast = self.state.forecast(&described, Utc::now()).await;
            debug!(
                "Predict: p={:.3}, {} rows",
                forecast.confidence,
                forecast.all_forecasts.len()
            );
            document_id = described.document_id.clone();
            metadata = Some(described);
            timings.push(PhaseTiming::new(Phase::Predict, t.elapsed()));
            Some(forecast)
        } else {
            None
        };

        // Detect
        let t = Instant::now();
        let detection = self
            .detector
            .detect_all(artifact)
            .await
            .map_err(|e| EngineError::collaborator(Phase::Detect, e))?;
        timings.push(PhaseTiming::new(Phase::Detect, t.elapsed()));
        info!("Detect: {} violations", detection.violations.len());

        // Diagnose
        let t = Instant::now();
        let diagnosis = diagnose(&detection, pipeline.systemic_threshold);
        timings.push(PhaseTiming::new(Phase::Diagnose, t.elapsed()));
        debug!(
            "Diagnose: {} systemic, {} individual",
            diagnosis.systemic.len(),
            diagnosis.individual.len()
        );

        // Decide
        let t = Instant::now();
        let plan = self
            .planner
            .generate_fix_plan(artifact, &detection)
            .await
            .map_err(|e| EngineError::collaborator(Phase::Decide, e))?;
        timings.push(PhaseTiming::new(Phase::Decide, t.elapsed()));
        debug!("Decide: {} fixes planned", plan.fixes.len());

        // Deploy
        let t = Instant::now();
        let execution = self
            .executor
            .execute_fix_plan(&plan)
            .await
            .map_err(|e| EngineError::collaborator(Phase::Deploy, e))?;
        timings.push(PhaseTiming::new(Phase::Deploy, t.elapsed()));
        info!(
            "Deploy: {} succeeded, {} failed",
            execution.results.success.len(),
            execution.results.failed.len()
        );

        // Verify
        let t = Instant::now();
        let after = self
            .detector
            .detect_all(artifact)
            .await
            .map_err(|e| EngineError::collaborator(Phase::Verify, e))?;
        let verification = verify(&detection, &after);
        timings.push(PhaseTiming::new(Phase::Verify, t.elapsed()));
        info!(
            "Verify: {} -> {} violations, {} resolved, {} regressions",
            verification.violations_before,
            verification.violations_after,
            verification.resolved.len(),
            verification.regressions.len()
        );

        // Learn
        let (learning, retraining) = if pipeline.enable_learning {
            let t = Instant::now();
            let metadata = match metadata.take() {
                Some(m) => m,
                None => self.describe(artifact, Phase::Learn).await?,
            };
            document_id = metadata.document_id.clone();
            let now = Utc::now();
            let document = DocumentRecord {
                document_id: metadata.document_id.clone(),
                features: metadata.to_features(now),
                detected: detection.violations.iter().cloned().collect(),
                verified: after.violations.iter().cloned().collect(),
                predictions: prediction
                    .as_ref()
                    .map(PredictionRecord::from_forecast)
                    .unwrap_or_default(),
                recorded_at: now,
            };
            let report = self
                .state
                .apply_fix_results(&execution.results, Some(document), now)
                .await?;
            let retraining = self.state.retrain_if_due(now).await?;
            timings.push(PhaseTiming::new(Phase::Learn, t.elapsed()));
            (Some(report), retraining)
        } else {
            (None, None)
        };

        let metrics = RunMetrics::compute(
            timings,
            run_start.elapsed(),
            verification.violations_before,
            verification.violations_after,
            execution.stats.fixes_successful,
            verification.resolved.len(),
            pipeline.manual_fix_minutes,
        );
        let success = verification.regressions.is_empty()
            && verification.violations_after <= verification.violations_before;
        let improvement = metrics.improvement_percent;

        info!(
            "Run {} finished: success={}, improvement {:.1}%, {}ms",
            run_id, success, improvement, metrics.total_ms
        );

        Ok(RemediationReport {
            run_id,
            document_id,
            started_at,
            phases: RemediationLoop {
                prediction,
                detection,
                diagnosis,
                plan,
                execution,
                verification,
                learning,
                retraining,
            },
            metrics,
            success,
            improvement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::orchestrator::collaborators::{MockDetector, MockExecutor, MockPlanner};
    use crate::storage::EngineStore;
    use crate::types::{Severity, Violation, ViolationSet};
    use std::path::PathBuf;

    async fn state() -> Arc<EngineState> {
        Arc::new(
            EngineState::with_store(EngineConfig::default(), EngineStore::open_in_memory().unwrap())
                .await
                .unwrap(),
        )
    }

    fn detection() -> DetectionReport {
        DetectionReport::new(ViolationSet::from_violations(vec![Violation::new(
            "color_violation",
            "color",
            Severity::Major,
            "p1",
        )]))
    }

    fn describing_detector() -> MockDetector {
        let mut detector = MockDetector::new();
        detector
            .expect_describe()
            .returning(|_| Ok(ArtifactMetadata::new("doc-1")));
        detector
    }

    #[tokio::test]
    async fn test_planner_failure_aborts_without_commit() {
        let state = state().await;
        let mut detector = describing_detector();
        detector.expect_detect_all().times(1).returning(|_| Ok(detection()));
        let mut planner = MockPlanner::new();
        planner
            .expect_generate_fix_plan()
            .returning(|_, _| Err(anyhow::anyhow!("planner unavailable")));
        let mut executor = MockExecutor::new();
        executor.expect_execute_fix_plan().times(0);

        let orchestrator = RemediationOrchestrator::new(
            state.clone(),
            Arc::new(detector),
            Arc::new(planner),
            Arc::new(executor),
        );
        let err = orchestrator
            .remediate_document(&PathBuf::from("doc-1.indd"))
            .await
            .unwrap_err();

        assert_eq!(err.phase(), Some(Phase::Decide));
        assert_eq!(err.to_string(), "decide phase failed: planner unavailable");
        let stats = state.store().stats().await.unwrap();
        assert_eq!(stats.documents, 0);
        assert_eq!(stats.fix_attempts, 0);
        assert_eq!(stats.learning_events, 0);
        assert_eq!(stats.predictions_total, 0);
    }

    #[tokio::test]
    async fn test_verify_failure_is_tagged() {
        let state = state().await;
        let mut detector = describing_detector();
        let mut calls = 0;
        detector.expect_detect_all().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(detection())
            } else {
                Err(anyhow::anyhow!("detector crashed"))
            }
        });
        let mut planner = MockPlanner::new();
        planner.expect_generate_fix_plan().returning(|_, _| Ok(FixPlan::default()));
        let mut executor = MockExecutor::new();
        executor
            .expect_execute_fix_plan()
            .returning(|_| Ok(ExecutionReport::default()));

        let orchestrator = RemediationOrchestrator::new(
            state.clone(),
            Arc::new(detector),
            Arc::new(planner),
            Arc::new(executor),
        );
        let err = orchestrator
            .remediate_document(&PathBuf::from("doc-1.indd"))
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Verify));
        assert_eq!(state.store().stats().await.unwrap().learning_events, 0);
    }

    #[tokio::test]
    async fn test_prediction_disabled_skips_describe_until_learn() {
        let mut config = EngineConfig::default();
        config.pipeline.enable_prediction = false;
        config.pipeline.enable_learning = false;
        let state = Arc::new(
            EngineState::with_store(config, EngineStore::open_in_memory().unwrap())
                .await
                .unwrap(),
        );

        let mut detector = MockDetector::new();
        detector.expect_describe().times(0);
        detector.expect_detect_all().times(2).returning(|_| Ok(detection()));
        let mut planner = MockPlanner::new();
        planner.expect_generate_fix_plan().returning(|_, _| Ok(FixPlan::default()));
        let mut executor = MockExecutor::new();
        executor
            .expect_execute_fix_plan()
            .returning(|_| Ok(ExecutionReport::default()));

        let orchestrator = RemediationOrchestrator::new(
            state.clone(),
            Arc::new(detector),
            Arc::new(planner),
            Arc::new(executor),
        );
        let report = orchestrator
            .remediate_document(&PathBuf::from("doc-1.indd"))
            .await
            .unwrap();

        assert!(report.phases.prediction.is_none());
        assert!(report.phases.learning.is_none());
        assert!(report.success);
        assert_eq!(report.improvement, 0.0);
        assert_eq!(report.metrics.mttr_ms, 0.0);
        assert_eq!(report.document_id, "doc-1.indd");
        assert_eq!(report.metrics.phase_ms(Phase::Learn), None);
        assert_eq!(state.store().stats().await.unwrap().documents, 0);
    }
}
