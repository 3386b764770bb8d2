//! Shared types used across modules
//!
//! Violations as reported by the external Detector, and the closed set of
//! violation kinds the forecaster knows how to predict.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a detected violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A single quality defect found in an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Detector-specific type, e.g. "color_violation"
    #[serde(rename = "type")]
    pub violation_type: String,
    /// Grouping used by diagnosis, e.g. "color"
    pub category: String,
    pub severity: Severity,
    /// Free-text location ("page 3, frame 12")
    pub location: String,
}

impl Violation {
    pub fn new(
        violation_type: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        location: impl Into<String>,
    ) -> Self {
        Self {
            violation_type: violation_type.into(),
            category: category.into(),
            severity,
            location: location.into(),
        }
    }

    /// Identity used to compare before/after snapshots
    pub fn key(&self) -> ViolationKey {
        ViolationKey {
            violation_type: self.violation_type.clone(),
            location: self.location.clone(),
        }
    }
}

/// (type, location) identity of a violation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViolationKey {
    pub violation_type: String,
    pub location: String,
}

/// Violations bucketed by severity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationSet {
    #[serde(default)]
    pub critical: Vec<Violation>,
    #[serde(default)]
    pub major: Vec<Violation>,
    #[serde(default)]
    pub minor: Vec<Violation>,
}

impl ViolationSet {
    /// Bucket a flat list by severity
    pub fn from_violations(violations: impl IntoIterator<Item = Violation>) -> Self {
        let mut set = Self::default();
        for v in violations {
            match v.severity {
                Severity::Critical => set.critical.push(v),
                Severity::Major => set.major.push(v),
                Severity::Minor => set.minor.push(v),
            }
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.critical.iter().chain(self.major.iter()).chain(self.minor.iter())
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.major.len() + self.minor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Detector statistics block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub total_violations: usize,
}

/// Output of `Detector::detect_all`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub violations: ViolationSet,
    pub stats: DetectionStats,
}

impl DetectionReport {
    pub fn new(violations: ViolationSet) -> Self {
        let total_violations = violations.len();
        Self {
            violations,
            stats: DetectionStats { total_violations },
        }
    }

    /// Distinct violation types present in the report
    pub fn violation_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.violations.iter().map(|v| v.violation_type.clone()).collect();
        types.sort();
        types.dedup();
        types
    }
}

/// Violation kinds the forecaster predicts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViolationKind {
    ColorViolation,
    TypographyViolation,
    TextOverflow,
    ImageResolution,
    SpacingInconsistency,
    Other(String),
}

impl ViolationKind {
    pub fn as_str(&self) -> &str {
        match self {
            ViolationKind::ColorViolation => "color_violation",
            ViolationKind::TypographyViolation => "typography_violation",
            ViolationKind::TextOverflow => "text_overflow",
            ViolationKind::ImageResolution => "image_resolution",
            ViolationKind::SpacingInconsistency => "spacing_inconsistency",
            ViolationKind::Other(name) => name,
        }
    }
}

impl From<String> for ViolationKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "color_violation" => ViolationKind::ColorViolation,
            "typography_violation" => ViolationKind::TypographyViolation,
            "text_overflow" => ViolationKind::TextOverflow,
            "image_resolution" => ViolationKind::ImageResolution,
            "spacing_inconsistency" => ViolationKind::SpacingInconsistency,
            _ => ViolationKind::Other(s),
        }
    }
}

impl From<&str> for ViolationKind {
    fn from(s: &str) -> Self {
        ViolationKind::from(s.to_string())
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
