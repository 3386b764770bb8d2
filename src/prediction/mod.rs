//! Violation prediction
//!
//! This module provides:
//! - Feature extraction from artifact metadata
//! - A logistic-regression classifier with seeded training
//! - A forecaster that turns the classifier's probability into ranked
//!   per-type forecasts, recommended checks, and prevention strategies

pub mod classifier;
pub mod features;
pub mod forecaster;

pub use classifier::{
    retraining_due, sigmoid, ClassifierOutput, LogisticClassifier, ModelSnapshot, TrainingOutcome,
};
pub use features::{ArtifactMetadata, FeatureVector, TrainingSample, FEATURE_COUNT, FEATURE_NAMES};
pub use forecaster::{
    CheckPriority, PreventionStrategy, RecommendedCheck, TypeForecast, ViolationForecast,
    ViolationForecaster,
};
