//! Violation classifier
//!
//! Logistic regression trained by full-batch gradient descent. Maps an
//! artifact's feature vector to the probability that inspection will find at
//! least one violation.

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::features::{FeatureVector, TrainingSample};
use crate::config::{ClassifierConfig, RetrainCadence};

/// Logits are clamped to this magnitude so the sigmoid stays inside (0, 1)
const MAX_LOGIT: f64 = 30.0;

/// Magnitude of the random initial weights
const INIT_SCALE: f64 = 0.01;

/// Probability at or above which the thresholded label is 1
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Logistic function, 1 / (1 + e^-z)
pub fn sigmoid(z: f64) -> f64 {
    let z = z.clamp(-MAX_LOGIT, MAX_LOGIT);
    1.0 / (1.0 + (-z).exp())
}

/// Whether the model should be retrained.
///
/// Due when it was never trained, or when elapsed days strictly exceed the
/// cadence threshold.
pub fn retraining_due(
    last_trained_at: Option<DateTime<Utc>>,
    cadence: RetrainCadence,
    now: DateTime<Utc>,
) -> bool {
    match last_trained_at {
        None => true,
        Some(at) => {
            let elapsed_days = (now - at).num_seconds() as f64 / 86_400.0;
            elapsed_days > cadence.threshold_days()
        }
    }
}

/// Result of classifying one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub probability: f64,
    pub label: bool,
}

/// What a call to `train` did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingOutcome {
    /// Too few samples; prior weights untouched
    Skipped { samples: usize, required: usize },
    Trained { samples: usize, accuracy: f64 },
}

/// Persisted form of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Training-set accuracy, 0-100
    pub accuracy: f64,
    pub trained_at: Option<DateTime<Utc>>,
}

/// Binary logistic-regression classifier
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticClassifier {
    weights: Vec<f64>,
    bias: f64,
    accuracy: f64,
    trained_at: Option<DateTime<Utc>>,
}

impl LogisticClassifier {
    /// Untrained model with zero weights; predicts 0.5 for everything
    pub fn new(feature_count: usize) -> Self {
        Self {
            weights: vec![0.0; feature_count],
            bias: 0.0,
            accuracy: 0.0,
            trained_at: None,
        }
    }

    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        Self {
            weights: snapshot.weights,
            bias: snapshot.bias,
            accuracy: snapshot.accuracy,
            trained_at: snapshot.trained_at,
        }
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot {
            weights: self.weights.clone(),
            bias: self.bias,
            accuracy: self.accuracy,
            trained_at: self.trained_at,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Training-set accuracy, 0-100
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }

    pub fn is_trained(&self) -> bool {
        self.trained_at.is_some()
    }

    fn logit(&self, features: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.bias
    }

    /// Probability and thresholded label for one vector
    pub fn predict(&self, features: &FeatureVector) -> ClassifierOutput {
        let probability = sigmoid(self.logit(features.as_slice()));
        ClassifierOutput {
            probability,
            label: probability >= DECISION_THRESHOLD,
        }
    }

    pub fn predict_batch(&self, vectors: &[FeatureVector]) -> Vec<ClassifierOutput> {
        vectors.iter().map(|v| self.predict(v)).collect()
    }

    /// Train in place with the current wall clock as the training timestamp
    pub fn train(&mut self, samples: &[TrainingSample], config: &ClassifierConfig) -> TrainingOutcome {
        self.train_at(samples, config, Utc::now())
    }

    /// Train in place.
    ///
    /// With fewer than `min_training_samples` samples this logs and returns
    /// `Skipped`, leaving the previous weights intact. Otherwise weights are
    /// re-initialised (seeded when `config.seed` is set), fitted for
    /// `config.epochs` epochs, and accuracy is recomputed on the training set.
    pub fn train_at(
        &mut self,
        samples: &[TrainingSample],
        config: &ClassifierConfig,
        now: DateTime<Utc>,
    ) -> TrainingOutcome {
        if samples.len() < config.min_training_samples {
            info!(
                "Insufficient training data: {} samples (need {}), keeping current model",
                samples.len(),
                config.min_training_samples
            );
            return TrainingOutcome::Skipped {
                samples: samples.len(),
                required: config.min_training_samples,
            };
        }

        let feature_count = self.weights.len();
        let usable: Vec<&TrainingSample> = samples
            .iter()
            .filter(|s| s.features.len() == feature_count)
            .collect();
        if usable.len() != samples.len() {
            warn!(
                "Dropped {} training samples with wrong feature count (expected {})",
                samples.len() - usable.len(),
                feature_count
            );
        }
        if usable.len() < config.min_training_samples {
            info!("Insufficient well-formed training data, keeping current model");
            return TrainingOutcome::Skipped {
                samples: usable.len(),
                required: config.min_training_samples,
            };
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut weights: Vec<f64> = (0..feature_count)
            .map(|_| rng.random_range(-INIT_SCALE..INIT_SCALE))
            .collect();
        let mut bias = 0.0;

        let n = usable.len() as f64;
        for epoch in 0..config.epochs {
            let mut grad_w = vec![0.0; feature_count];
            let mut grad_b = 0.0;

            for sample in &usable {
                let x = sample.features.as_slice();
                let z: f64 = weights.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>() + bias;
                let error = sigmoid(z) - if sample.label { 1.0 } else { 0.0 };
                for (g, xi) in grad_w.iter_mut().zip(x) {
                    *g += error * xi;
                }
                grad_b += error;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= config.learning_rate * g / n;
            }
            bias -= config.learning_rate * grad_b / n;

            if epoch % 250 == 0 {
                debug!("epoch {}: bias {:.4}", epoch, bias);
            }
        }

        self.weights = weights;
        self.bias = bias;

        let correct = usable
            .iter()
            .filter(|s| self.predict(&s.features).label == s.label)
            .count();
        self.accuracy = correct as f64 / n * 100.0;
        self.trained_at = Some(now);

        info!(
            "Classifier trained on {} samples: accuracy {:.1}%",
            usable.len(),
            self.accuracy
        );
        TrainingOutcome::Trained {
            samples: usable.len(),
            accuracy: self.accuracy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn config(seed: u64) -> ClassifierConfig {
        ClassifierConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    /// Separable on the first feature: label is x0 > 5
    fn separable_samples() -> Vec<TrainingSample> {
        (0..20)
            .map(|i| {
                let x = i as f64 * 0.5;
                TrainingSample::new(vec![x, 1.0], x > 5.0)
            })
            .collect()
    }

    #[test]
    fn test_sigmoid_bounds_and_monotonicity() {
        let mut previous = 0.0;
        for step in -300..=300 {
            let z = step as f64 / 10.0;
            let s = sigmoid(z);
            assert!(s > 0.0 && s < 1.0, "sigmoid({}) = {}", z, s);
            assert!(s > previous, "sigmoid not increasing at {}", z);
            previous = s;
        }
        assert_eq!(sigmoid(0.0), 0.5);
        let extreme = sigmoid(1e6);
        assert!(extreme > 0.0 && extreme < 1.0);
        let extreme = sigmoid(-1e6);
        assert!(extreme > 0.0 && extreme < 1.0);
    }

    #[test]
    fn test_untrained_predicts_half() {
        let model = LogisticClassifier::new(3);
        let out = model.predict(&FeatureVector(vec![4.0, 2.0, 1.0]));
        assert_eq!(out.probability, 0.5);
        assert!(out.label);
        assert!(!model.is_trained());
    }

    #[test]
    fn test_train_with_too_few_samples_is_noop() {
        let mut model = LogisticClassifier::new(2);
        let mut trained = model.clone();
        trained.train(&separable_samples(), &config(1));
        let before = trained.clone();

        let outcome = trained.train(&separable_samples()[..9], &config(2));
        assert_eq!(outcome, TrainingOutcome::Skipped { samples: 9, required: 10 });
        assert_eq!(trained, before);

        let outcome = model.train(&[], &config(3));
        assert!(matches!(outcome, TrainingOutcome::Skipped { samples: 0, .. }));
        assert_eq!(model.weights(), &[0.0, 0.0]);
        assert_eq!(model.bias(), 0.0);
    }

    #[test]
    fn test_seeded_training_is_deterministic() {
        let now = Utc::now();
        let mut a = LogisticClassifier::new(2);
        let mut b = LogisticClassifier::new(2);
        a.train_at(&separable_samples(), &config(42), now);
        b.train_at(&separable_samples(), &config(42), now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_training_learns_separable_data() {
        let mut model = LogisticClassifier::new(2);
        let cfg = ClassifierConfig {
            epochs: 5000,
            learning_rate: 0.1,
            seed: Some(7),
            ..Default::default()
        };
        let outcome = model.train(&separable_samples(), &cfg);
        match outcome {
            TrainingOutcome::Trained { samples, accuracy } => {
                assert_eq!(samples, 20);
                assert!(accuracy >= 80.0, "accuracy {}", accuracy);
            }
            other => panic!("expected training, got {:?}", other),
        }
        assert!(model.weights()[0] > 0.0);
        let low = model.predict(&FeatureVector(vec![0.0, 1.0]));
        let high = model.predict(&FeatureVector(vec![9.5, 1.0]));
        assert!(high.probability > low.probability);
        assert!(model.is_trained());
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let mut model = LogisticClassifier::new(2);
        model.train(&separable_samples(), &config(9));
        let json = serde_json::to_string(&model.snapshot()).unwrap();
        let restored = LogisticClassifier::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored, model);
    }

    #[test]
    fn test_retraining_due_boundaries() {
        let now = Utc::now();
        assert!(retraining_due(None, RetrainCadence::Weekly, now));
        assert!(!retraining_due(Some(now - Duration::days(7)), RetrainCadence::Weekly, now));
        assert!(retraining_due(
            Some(now - Duration::days(7) - Duration::seconds(1)),
            RetrainCadence::Weekly,
            now
        ));
        assert!(!retraining_due(Some(now - Duration::days(1)), RetrainCadence::Daily, now));
        assert!(retraining_due(Some(now - Duration::days(2)), RetrainCadence::Daily, now));
        assert!(!retraining_due(Some(now - Duration::days(30)), RetrainCadence::Monthly, now));
        assert!(retraining_due(Some(now - Duration::days(31)), RetrainCadence::Monthly, now));
    }
}
