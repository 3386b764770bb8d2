//! Persistent learning store
//!
//! Everything the engine learns lives in one SQLite database: the document
//! corpus, predictions and their outcomes, the classifier model and its
//! training history, the fix attempt log, strategy profiles, learning events,
//! and advisory improvements.

pub mod sqlite;

pub use sqlite::EngineStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::prediction::{FeatureVector, ViolationForecast};
use crate::strategy::{FixAttempt, Insight, StrategyImprovement, StrategyProfile};
use crate::types::Violation;

/// One persisted per-type forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: String,
    pub document_id: String,
    pub violation_type: String,
    pub probability: f64,
    pub predicted_at: DateTime<Utc>,
    /// Filled once the document's real violations are known
    pub correct: Option<bool>,
}

impl PredictionRecord {
    /// One record per triggered forecast row
    pub fn from_forecast(forecast: &ViolationForecast) -> Vec<Self> {
        forecast
            .all_forecasts
            .iter()
            .map(|row| Self {
                id: uuid::Uuid::new_v4().to_string(),
                document_id: forecast.document_id.clone(),
                violation_type: row.kind.to_string(),
                probability: row.probability,
                predicted_at: forecast.predicted_at,
                correct: None,
            })
            .collect()
    }
}

/// Audit row for one `learn_from_fixes` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningEvent {
    pub fixes_analyzed: usize,
    pub strategies_improved: usize,
    pub accuracy_gain: f64,
    pub insights: Vec<Insight>,
    pub created_at: DateTime<Utc>,
}

/// Everything a learning session writes, committed atomically
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub attempts: Vec<FixAttempt>,
    pub profiles: Vec<StrategyProfile>,
    pub improvements: Vec<StrategyImprovement>,
    pub event: LearningEvent,
}

/// Corpus entry written by the Learn phase of a remediation run
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub document_id: String,
    pub features: FeatureVector,
    /// Detect-phase snapshot
    pub detected: Vec<Violation>,
    /// Verify-phase snapshot; its size labels the training sample
    pub verified: Vec<Violation>,
    /// Predictions made during this run
    pub predictions: Vec<PredictionRecord>,
    pub recorded_at: DateTime<Utc>,
}

/// Row counts and accuracy figures for diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: usize,
    pub violations: usize,
    pub training_runs: usize,
    pub predictions_total: usize,
    pub predictions_resolved: usize,
    pub predictions_correct: usize,
    pub fix_attempts: usize,
    pub fix_successes: usize,
    pub learning_events: usize,
    pub strategy_improvements: usize,
}

impl StoreStats {
    /// Percentage of resolved predictions that were correct
    pub fn prediction_accuracy(&self) -> f64 {
        if self.predictions_resolved == 0 {
            0.0
        } else {
            self.predictions_correct as f64 / self.predictions_resolved as f64 * 100.0
        }
    }
}
