//! Shared engine state
//!
//! `EngineState` owns the classifier, the strategy tracker, and the store.
//! Every entry point takes it explicitly; there is no process-wide state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::prediction::{
    retraining_due, ArtifactMetadata, LogisticClassifier, TrainingOutcome, ViolationForecast,
    ViolationForecaster, FEATURE_COUNT,
};
use crate::storage::{
    DocumentRecord, EngineStore, LearningEvent, PredictionRecord, SessionRecord,
};
use crate::strategy::{
    generate_insights, FixAttempt, FixResults, LearningReport, StrategyImprovement, StrategyProfile,
    StrategyTracker, Technique,
};

/// Diagnostic snapshot of the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    pub trained: bool,
    /// Training-set accuracy, 0-100
    pub accuracy: f64,
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_count: usize,
    pub training_runs: usize,
    pub corpus_size: usize,
    pub predictions_total: usize,
    pub predictions_resolved: usize,
    /// Correct / resolved, 0-100
    pub prediction_accuracy: f64,
    pub retraining_due: bool,
}

/// Diagnostic snapshot of strategy learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStatistics {
    /// Best success rate first
    pub profiles: Vec<StrategyProfile>,
    pub total_attempts: usize,
    pub successful_attempts: usize,
    pub learning_events: usize,
    pub recent_improvements: Vec<StrategyImprovement>,
}

const RECENT_IMPROVEMENTS: usize = 10;

/// Classifier, tracker, forecaster, and their backing store
pub struct EngineState {
    config: EngineConfig,
    classifier: RwLock<LogisticClassifier>,
    tracker: RwLock<StrategyTracker>,
    forecaster: ViolationForecaster,
    store: EngineStore,
    run_lock: Mutex<()>,
}

impl EngineState {
    /// Open the configured store, load persisted state, and retrain if due
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let path = config
            .storage
            .resolve_database_path()
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let store = EngineStore::open(path).await?;
        Self::with_store(config, store).await
    }

    /// Build state over an existing store
    pub async fn with_store(config: EngineConfig, store: EngineStore) -> EngineResult<Self> {
        let classifier = match store.load_model().await? {
            Some(snapshot) if snapshot.weights.len() == FEATURE_COUNT => {
                info!("Loaded classifier model (accuracy {:.1}%)", snapshot.accuracy);
                LogisticClassifier::from_snapshot(snapshot)
            }
            Some(snapshot) => {
                warn!(
                    "Stored model has {} weights, expected {}; needs training",
                    snapshot.weights.len(),
                    FEATURE_COUNT
                );
                LogisticClassifier::new(FEATURE_COUNT)
            }
            None => {
                info!("No classifier model found; needs training");
                LogisticClassifier::new(FEATURE_COUNT)
            }
        };

        let profiles = store.load_profiles().await?;
        debug!("Loaded {} persisted strategy profiles", profiles.len());
        let tracker = StrategyTracker::with_profiles(config.tracker.clone(), profiles);

        let state = Self {
            forecaster: ViolationForecaster::new(config.forecaster.clone()),
            classifier: RwLock::new(classifier),
            tracker: RwLock::new(tracker),
            store,
            run_lock: Mutex::new(()),
            config,
        };
        state.retrain_if_due(Utc::now()).await?;
        Ok(state)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &EngineStore {
        &self.store
    }

    /// Serialises writers of the attempt log and classifier weights
    pub(crate) async fn lock_run(&self) -> MutexGuard<'_, ()> {
        self.run_lock.lock().await
    }

    pub async fn classifier(&self) -> LogisticClassifier {
        self.classifier.read().await.clone()
    }

    pub async fn profile(&self, technique: &Technique) -> Option<StrategyProfile> {
        self.tracker.read().await.profile(technique).cloned()
    }

    // --- prediction ---------------------------------------------------------

    /// Forecast without persisting anything
    pub async fn forecast(&self, metadata: &ArtifactMetadata, now: DateTime<Utc>) -> ViolationForecast {
        let classifier = self.classifier.read().await;
        self.forecaster.forecast(&classifier, metadata, now)
    }

    /// Forecast violations for an artifact and record the predictions
    pub async fn predict_violations(&self, metadata: &ArtifactMetadata) -> EngineResult<ViolationForecast> {
        let forecast = self.forecast(metadata, Utc::now()).await;
        self.store
            .record_predictions(&PredictionRecord::from_forecast(&forecast))
            .await?;
        info!(
            "Predicted {} for {} (p={:.3}, {} likely, {} checks)",
            if forecast.has_violations { "violations" } else { "clean" },
            forecast.document_id,
            forecast.confidence,
            forecast.likely_violations.len(),
            forecast.recommended_checks.len()
        );
        Ok(forecast)
    }

    // --- training -----------------------------------------------------------

    /// Retrain from the corpus when the cadence says so
    pub async fn retrain_if_due(&self, now: DateTime<Utc>) -> EngineResult<Option<TrainingOutcome>> {
        let last = self.classifier.read().await.trained_at();
        if !retraining_due(last, self.config.classifier.retrain_cadence, now) {
            debug!("Retraining not due (last trained {:?})", last);
            return Ok(None);
        }
        self.retrain_at(now).await.map(Some)
    }

    /// Retrain from the corpus regardless of cadence
    pub async fn retrain(&self) -> EngineResult<TrainingOutcome> {
        let _guard = self.lock_run().await;
        self.retrain_at(Utc::now()).await
    }

    async fn retrain_at(&self, now: DateTime<Utc>) -> EngineResult<TrainingOutcome> {
        let samples = self.store.training_samples().await?;
        let mut candidate = self.classifier.read().await.clone();
        let outcome = candidate.train_at(&samples, &self.config.classifier, now);

        if let TrainingOutcome::Trained { samples, accuracy } = &outcome {
            self.store.save_trained_model(&candidate.snapshot(), *samples).await?;
            *self.classifier.write().await = candidate;
            info!("Retrained classifier on {} samples ({:.1}% accuracy)", samples, accuracy);
        }
        Ok(outcome)
    }

    // --- strategy learning --------------------------------------------------

    /// Learn from one batch of executor results
    pub async fn learn_from_fixes(&self, results: &FixResults) -> EngineResult<LearningReport> {
        let _guard = self.lock_run().await;
        self.apply_fix_results(results, None, Utc::now()).await
    }

    /// Apply a learning session; caller holds the run lock.
    ///
    /// Tracker changes are made on a copy and only published after the store
    /// commit succeeds, so a failed write leaves shared state untouched.
    pub(crate) async fn apply_fix_results(
        &self,
        results: &FixResults,
        document: Option<DocumentRecord>,
        now: DateTime<Utc>,
    ) -> EngineResult<LearningReport> {
        let attempts = results.to_attempts(now);
        let mut tracker = self.tracker.read().await.clone();
        let previous: HashMap<Technique, (f64, f64, f64)> = tracker
            .profiles()
            .into_iter()
            .map(|p| (p.technique.clone(), (p.success_rate, p.avg_time_ms, p.confidence)))
            .collect();
        let mean_before = tracker.mean_success_rate();

        // attempts are in completion order; the two rules do not commute
        let mut improvements = Vec::new();
        for attempt in &attempts {
            if attempt.success {
                tracker.on_success(&attempt.technique, now);
            } else {
                improvements.push(tracker.on_failure(&attempt.technique, attempt.error.as_deref(), now));
            }
        }

        let window = tracker.config().recompute_window;
        for technique in tracker.techniques() {
            // this session's attempts are not in the store yet; they are the newest
            let mut recent: Vec<FixAttempt> = attempts
                .iter()
                .rev()
                .filter(|a| a.technique == technique)
                .cloned()
                .collect();
            if recent.len() < window {
                recent.extend(self.store.recent_attempts(&technique, window - recent.len()).await?);
            }
            tracker.recompute_profile(&technique, &recent, now);
        }

        let strategies_improved = tracker
            .profiles()
            .into_iter()
            .filter(|p| previous.get(&p.technique) != Some(&(p.success_rate, p.avg_time_ms, p.confidence)))
            .count();
        let accuracy_gain = tracker.mean_success_rate() - mean_before;
        let insights = generate_insights(&attempts, &improvements, self.config.pipeline.manual_fix_minutes);

        let session = SessionRecord {
            profiles: tracker.profiles().into_iter().cloned().collect(),
            improvements: improvements.clone(),
            event: LearningEvent {
                fixes_analyzed: attempts.len(),
                strategies_improved,
                accuracy_gain,
                insights: insights.clone(),
                created_at: now,
            },
            attempts,
        };
        self.store.commit_learning(&session, document.as_ref()).await?;
        *self.tracker.write().await = tracker;

        info!(
            "Learned from {} fixes: {} strategies changed, accuracy gain {:+.4}",
            session.event.fixes_analyzed, strategies_improved, accuracy_gain
        );

        Ok(LearningReport {
            fixes_analyzed: session.event.fixes_analyzed,
            strategies_improved,
            accuracy_gain,
            insights,
            improvements,
        })
    }

    // --- diagnostics --------------------------------------------------------

    pub async fn model_statistics(&self) -> EngineResult<ModelStatistics> {
        let stats = self.store.stats().await?;
        let classifier = self.classifier.read().await;
        Ok(ModelStatistics {
            trained: classifier.is_trained(),
            accuracy: classifier.accuracy(),
            trained_at: classifier.trained_at(),
            feature_count: classifier.weights().len(),
            training_runs: stats.training_runs,
            corpus_size: stats.documents,
            predictions_total: stats.predictions_total,
            predictions_resolved: stats.predictions_resolved,
            prediction_accuracy: stats.prediction_accuracy(),
            retraining_due: retraining_due(
                classifier.trained_at(),
                self.config.classifier.retrain_cadence,
                Utc::now(),
            ),
        })
    }

    pub async fn learning_statistics(&self) -> EngineResult<LearningStatistics> {
        let stats = self.store.stats().await?;
        let recent_improvements = self.store.recent_improvements(RECENT_IMPROVEMENTS).await?;
        let profiles = self
            .tracker
            .read()
            .await
            .profiles()
            .into_iter()
            .cloned()
            .collect();
        Ok(LearningStatistics {
            profiles,
            total_attempts: stats.fix_attempts,
            successful_attempts: stats.fix_successes,
            learning_events: stats.learning_events,
            recent_improvements,
        })
    }
}
