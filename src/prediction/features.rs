//! Artifact metadata and its numeric feature vector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of features produced by `ArtifactMetadata::to_features`
pub const FEATURE_COUNT: usize = 10;

/// Feature names, in vector order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "page_count",
    "image_count",
    "text_frame_count",
    "color_count",
    "font_count",
    "has_custom_colors",
    "has_custom_fonts",
    "complexity_score",
    "days_since_last_check",
    "prior_violation_count",
];

/// Summary of an artifact as known before inspection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub document_id: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub image_count: u32,
    #[serde(default)]
    pub text_frame_count: u32,
    #[serde(default)]
    pub color_count: u32,
    #[serde(default)]
    pub font_count: u32,
    #[serde(default)]
    pub has_custom_colors: bool,
    #[serde(default)]
    pub has_custom_fonts: bool,
    /// Derived layout complexity in [0, 1]
    #[serde(default)]
    pub complexity_score: f64,
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prior_violation_count: u32,
}

impl ArtifactMetadata {
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            ..Default::default()
        }
    }

    /// Whole days since the last check, 0 when never checked
    pub fn days_since_last_check(&self, now: DateTime<Utc>) -> f64 {
        self.last_checked_at
            .map(|at| ((now - at).num_seconds().max(0) as f64 / 86_400.0).floor())
            .unwrap_or(0.0)
    }

    /// Build the fixed-order feature vector
    pub fn to_features(&self, now: DateTime<Utc>) -> FeatureVector {
        FeatureVector(vec![
            self.page_count as f64,
            self.image_count as f64,
            self.text_frame_count as f64,
            self.color_count as f64,
            self.font_count as f64,
            flag(self.has_custom_colors),
            flag(self.has_custom_fonts),
            self.complexity_score,
            self.days_since_last_check(now),
            self.prior_violation_count as f64,
        ])
    }
}

fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}

/// Ordered numeric features of one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub Vec<f64>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector(values)
    }
}

/// One historical artifact and whether it had any violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub label: bool,
}

impl TrainingSample {
    pub fn new(features: impl Into<FeatureVector>, label: bool) -> Self {
        Self {
            features: features.into(),
            label,
        }
    }
}
