//! Configuration management
//!
//! Manages engine configuration: classifier training, forecast gates,
//! technique tracking, pipeline behaviour, and storage location.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Violation classifier training
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Forecast gates
    #[serde(default)]
    pub forecaster: ForecasterConfig,
    /// Technique performance tracking
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// Remediation loop behaviour
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Learning store location
    #[serde(default)]
    pub storage: StorageConfig,
}

/// How often the classifier is retrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrainCadence {
    Daily,
    Weekly,
    Monthly,
}

impl RetrainCadence {
    /// Elapsed days that must be strictly exceeded before retraining
    pub fn threshold_days(&self) -> f64 {
        match self {
            RetrainCadence::Daily => 1.0,
            RetrainCadence::Weekly => 7.0,
            RetrainCadence::Monthly => 30.0,
        }
    }
}

impl Default for RetrainCadence {
    fn default() -> Self {
        RetrainCadence::Weekly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Full-batch gradient descent epochs
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_classifier_learning_rate")]
    pub learning_rate: f64,
    /// Training is skipped below this many samples
    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,
    /// Fixed seed for weight initialisation; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub retrain_cadence: RetrainCadence,
}

fn default_epochs() -> usize {
    1000
}

fn default_classifier_learning_rate() -> f64 {
    0.01
}

fn default_min_training_samples() -> usize {
    10
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_classifier_learning_rate(),
            min_training_samples: default_min_training_samples(),
            seed: None,
            retrain_cadence: RetrainCadence::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecasterConfig {
    /// Gate for `likely_violations`
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Gate for `recommended_checks`
    #[serde(default = "default_check_threshold")]
    pub check_threshold: f64,
    /// Gate for `prevention_strategies`
    #[serde(default = "default_prevention_threshold")]
    pub prevention_threshold: f64,
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_check_threshold() -> f64 {
    0.2
}

fn default_prevention_threshold() -> f64 {
    0.5
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            check_threshold: default_check_threshold(),
            prevention_threshold: default_prevention_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Reinforcement/decay rate (alpha)
    #[serde(default = "default_tracker_learning_rate")]
    pub learning_rate: f64,
    /// How many recent attempts a recomputation reads
    #[serde(default = "default_recompute_window")]
    pub recompute_window: usize,
    /// Recomputation is skipped below this many attempts
    #[serde(default = "default_min_attempts")]
    pub min_attempts: usize,
    /// Improvement records kept on each profile, oldest dropped first
    #[serde(default = "default_profile_log_limit")]
    pub profile_log_limit: usize,
}

fn default_tracker_learning_rate() -> f64 {
    0.1
}

fn default_recompute_window() -> usize {
    50
}

fn default_min_attempts() -> usize {
    5
}

fn default_profile_log_limit() -> usize {
    100
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_tracker_learning_rate(),
            recompute_window: default_recompute_window(),
            min_attempts: default_min_attempts(),
            profile_log_limit: default_profile_log_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run the Predict phase before Detect
    #[serde(default = "default_true")]
    pub enable_prediction: bool,
    /// Run the Learn phase after Verify
    #[serde(default = "default_true")]
    pub enable_learning: bool,
    /// Categories with more violations than this are systemic
    #[serde(default = "default_systemic_threshold")]
    pub systemic_threshold: usize,
    /// Manual effort assumed per fix when estimating time saved
    #[serde(default = "default_manual_fix_minutes")]
    pub manual_fix_minutes: f64,
}

fn default_true() -> bool {
    true
}

fn default_systemic_threshold() -> usize {
    3
}

fn default_manual_fix_minutes() -> f64 {
    35.0
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            enable_prediction: true,
            enable_learning: true,
            systemic_threshold: default_systemic_threshold(),
            manual_fix_minutes: default_manual_fix_minutes(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path; defaults to `<data_dir>/learning.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("learning.db")),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = EngineConfig::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: EngineConfig = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(path, contents)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Reject values that would make the update rules meaningless
    pub fn validate(&self) -> Result<()> {
        let gates = [
            ("forecaster.confidence_threshold", self.forecaster.confidence_threshold),
            ("forecaster.check_threshold", self.forecaster.check_threshold),
            ("forecaster.prevention_threshold", self.forecaster.prevention_threshold),
            ("tracker.learning_rate", self.tracker.learning_rate),
        ];
        for (name, value) in gates {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{} must be within [0, 1], got {}", name, value);
            }
        }
        if self.classifier.learning_rate <= 0.0 {
            anyhow::bail!("classifier.learning_rate must be positive");
        }
        if self.tracker.recompute_window < self.tracker.min_attempts {
            anyhow::bail!(
                "tracker.recompute_window ({}) is smaller than tracker.min_attempts ({})",
                self.tracker.recompute_window,
                self.tracker.min_attempts
            );
        }
        Ok(())
    }
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "remediation-engine", "remediation-engine")
        .context("Failed to get project directories")?;
    Ok(base.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    let base = directories::ProjectDirs::from("com", "remediation-engine", "remediation-engine")
        .context("Failed to get project directories")?;
    Ok(base.data_dir().to_path_buf())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = EngineConfig::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.classifier.epochs, 1000);
        assert_eq!(config.classifier.learning_rate, 0.01);
        assert_eq!(config.classifier.min_training_samples, 10);
        assert_eq!(config.classifier.retrain_cadence, RetrainCadence::Weekly);
        assert_eq!(config.forecaster.confidence_threshold, 0.7);
        assert_eq!(config.tracker.recompute_window, 50);
        assert_eq!(config.tracker.min_attempts, 5);
        assert_eq!(config.tracker.profile_log_limit, 100);
        assert_eq!(config.pipeline.manual_fix_minutes, 35.0);
        assert!(config.pipeline.enable_prediction);
        assert!(config.pipeline.enable_learning);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
[classifier]
seed = 7
retrain_cadence = "daily"

[pipeline]
enable_prediction = false
"#,
        )
        .unwrap();
        assert_eq!(config.classifier.seed, Some(7));
        assert_eq!(config.classifier.retrain_cadence, RetrainCadence::Daily);
        assert_eq!(config.classifier.epochs, 1000);
        assert!(!config.pipeline.enable_prediction);
        assert!(config.pipeline.enable_learning);
        assert_eq!(config.tracker.learning_rate, 0.1);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = EngineConfig::default();
        config.tracker.learning_rate = 0.2;
        config.save_to(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.tracker.learning_rate, 0.2);
    }

    #[test]
    fn test_validate_rejects_out_of_range_gate() {
        let mut config = EngineConfig::default();
        config.forecaster.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.tracker.recompute_window = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cadence_thresholds() {
        assert_eq!(RetrainCadence::Daily.threshold_days(), 1.0);
        assert_eq!(RetrainCadence::Weekly.threshold_days(), 7.0);
        assert_eq!(RetrainCadence::Monthly.threshold_days(), 30.0);
    }
}
