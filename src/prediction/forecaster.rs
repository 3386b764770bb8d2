//! Violation forecaster
//!
//! Expands the classifier's single probability into per-type forecasts using
//! fixed heuristic multipliers, then derives recommended checks and
//! prevention strategies from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::classifier::{ClassifierOutput, LogisticClassifier};
use super::features::ArtifactMetadata;
use crate::config::ForecasterConfig;
use crate::types::ViolationKind;

/// Priority of a recommended check. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for CheckPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckPriority::Critical => f.pad("critical"),
            CheckPriority::High => f.pad("high"),
            CheckPriority::Medium => f.pad("medium"),
            CheckPriority::Low => f.pad("low"),
        }
    }
}

/// Forecast for one violation type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeForecast {
    pub kind: ViolationKind,
    pub probability: f64,
    /// Human-readable condition that triggered this row
    pub reason: String,
}

/// A check to run before full inspection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedCheck {
    pub kind: ViolationKind,
    pub priority: CheckPriority,
    pub check: String,
    pub estimated_minutes: u32,
}

/// A remediation template to apply pre-emptively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreventionStrategy {
    pub kind: ViolationKind,
    pub probability: f64,
    pub action: String,
    pub steps: Vec<String>,
    pub estimated_minutes_saved: u32,
}

/// Full forecast for one artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationForecast {
    pub document_id: String,
    pub has_violations: bool,
    /// Overall classifier probability
    pub confidence: f64,
    /// Rows at or above the confidence threshold
    pub likely_violations: Vec<TypeForecast>,
    pub recommended_checks: Vec<RecommendedCheck>,
    pub prevention_strategies: Vec<PreventionStrategy>,
    /// Every triggered row, sorted by probability
    pub all_forecasts: Vec<TypeForecast>,
    pub predicted_at: DateTime<Utc>,
}

/// Heuristic rule: if the condition holds, forecast `kind` at overall × multiplier
struct ForecastRule {
    kind: ViolationKind,
    multiplier: f64,
    reason: &'static str,
    applies: fn(&ArtifactMetadata) -> bool,
}

fn forecast_rules() -> Vec<ForecastRule> {
    vec![
        ForecastRule {
            kind: ViolationKind::ColorViolation,
            multiplier: 0.8,
            reason: "more than 7 colors or custom colors present",
            applies: |m| m.color_count > 7 || m.has_custom_colors,
        },
        ForecastRule {
            kind: ViolationKind::TypographyViolation,
            multiplier: 0.7,
            reason: "more than 2 fonts or custom fonts present",
            applies: |m| m.font_count > 2 || m.has_custom_fonts,
        },
        ForecastRule {
            kind: ViolationKind::TextOverflow,
            multiplier: 0.6,
            reason: "layout complexity above 0.7",
            applies: |m| m.complexity_score > 0.7,
        },
        ForecastRule {
            kind: ViolationKind::ImageResolution,
            multiplier: 0.5,
            reason: "more than 5 placed images",
            applies: |m| m.image_count > 5,
        },
        ForecastRule {
            kind: ViolationKind::SpacingInconsistency,
            multiplier: 0.4,
            reason: "more than 10 pages",
            applies: |m| m.page_count > 10,
        },
    ]
}

/// Static type → (priority, check description, minutes) table
fn check_template(kind: &ViolationKind) -> (CheckPriority, &'static str, u32) {
    match kind {
        ViolationKind::TextOverflow => (
            CheckPriority::Critical,
            "Check every text frame for overset text",
            5,
        ),
        ViolationKind::ColorViolation => (
            CheckPriority::High,
            "Verify all swatches against the brand palette",
            3,
        ),
        ViolationKind::ImageResolution => (
            CheckPriority::High,
            "Confirm placed images meet 300 ppi effective resolution",
            4,
        ),
        ViolationKind::TypographyViolation => (
            CheckPriority::Medium,
            "Verify font families and sizes against the type scale",
            3,
        ),
        ViolationKind::SpacingInconsistency => (
            CheckPriority::Low,
            "Spot-check margins and gutters on long documents",
            6,
        ),
        ViolationKind::Other(_) => (CheckPriority::Low, "Review manually", 10),
    }
}

/// Static remediation template per type: (action, steps, minutes saved)
fn prevention_template(kind: &ViolationKind) -> (&'static str, Vec<&'static str>, u32) {
    match kind {
        ViolationKind::ColorViolation => (
            "Restrict swatches to the approved palette",
            vec![
                "Load the brand swatch library",
                "Replace unnamed colors with nearest brand swatch",
                "Delete unused swatches",
            ],
            15,
        ),
        ViolationKind::TypographyViolation => (
            "Apply the approved paragraph styles",
            vec![
                "Map local overrides to paragraph styles",
                "Substitute non-brand fonts",
                "Clear character-level overrides",
            ],
            12,
        ),
        ViolationKind::TextOverflow => (
            "Enable auto-sizing on long text frames",
            vec![
                "Find frames with overset text",
                "Enable height auto-size or thread to a new frame",
                "Re-check page flow",
            ],
            10,
        ),
        ViolationKind::ImageResolution => (
            "Replace low-resolution placed images",
            vec![
                "List images below 300 ppi effective",
                "Relink to high-resolution sources",
                "Reduce scaling where sources are unavailable",
            ],
            20,
        ),
        ViolationKind::SpacingInconsistency => (
            "Normalise margins and gutters from the master grid",
            vec![
                "Reapply master pages",
                "Snap frames to the baseline grid",
            ],
            8,
        ),
        ViolationKind::Other(_) => (
            "Manual review",
            vec!["Inspect the affected pages", "Apply the relevant checklist"],
            5,
        ),
    }
}

/// Ranked per-type forecasting on top of the classifier
#[derive(Debug, Clone)]
pub struct ViolationForecaster {
    config: ForecasterConfig,
}

impl ViolationForecaster {
    pub fn new(config: ForecasterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Forecast violations for an artifact
    pub fn forecast(
        &self,
        classifier: &LogisticClassifier,
        metadata: &ArtifactMetadata,
        now: DateTime<Utc>,
    ) -> ViolationForecast {
        let output = classifier.predict(&metadata.to_features(now));
        self.forecast_from_output(output, metadata, now)
    }

    /// Forecast from an already computed classifier output
    pub fn forecast_from_output(
        &self,
        output: ClassifierOutput,
        metadata: &ArtifactMetadata,
        now: DateTime<Utc>,
    ) -> ViolationForecast {
        let all_forecasts = Self::type_forecasts(output.probability, metadata);
        let likely_violations = all_forecasts
            .iter()
            .filter(|f| f.probability >= self.config.confidence_threshold)
            .cloned()
            .collect();

        ViolationForecast {
            document_id: metadata.document_id.clone(),
            has_violations: output.label,
            confidence: output.probability,
            likely_violations,
            recommended_checks: self.recommend_checks(&all_forecasts),
            prevention_strategies: self.prevention_strategies(&all_forecasts),
            all_forecasts,
            predicted_at: now,
        }
    }

    /// Per-type rows for every rule that holds, sorted by probability descending
    pub fn type_forecasts(overall: f64, metadata: &ArtifactMetadata) -> Vec<TypeForecast> {
        let overall = overall.clamp(0.0, 1.0);
        let mut rows: Vec<TypeForecast> = forecast_rules()
            .into_iter()
            .filter(|rule| (rule.applies)(metadata))
            .map(|rule| TypeForecast {
                kind: rule.kind,
                probability: overall * rule.multiplier,
                reason: rule.reason.to_string(),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.probability
                .partial_cmp(&a.probability)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows
    }

    /// Checks for forecasts at or above the check gate, sorted by priority rank.
    /// The sort is stable, so ties keep input order.
    pub fn recommend_checks(&self, forecasts: &[TypeForecast]) -> Vec<RecommendedCheck> {
        let mut checks: Vec<RecommendedCheck> = forecasts
            .iter()
            .filter(|f| f.probability >= self.config.check_threshold)
            .map(|f| {
                let (priority, check, estimated_minutes) = check_template(&f.kind);
                RecommendedCheck {
                    kind: f.kind.clone(),
                    priority,
                    check: check.to_string(),
                    estimated_minutes,
                }
            })
            .collect();
        checks.sort_by_key(|c| c.priority);
        checks
    }

    /// Templates for forecasts at or above the prevention gate
    pub fn prevention_strategies(&self, forecasts: &[TypeForecast]) -> Vec<PreventionStrategy> {
        forecasts
            .iter()
            .filter(|f| f.probability >= self.config.prevention_threshold)
            .map(|f| {
                let (action, steps, estimated_minutes_saved) = prevention_template(&f.kind);
                PreventionStrategy {
                    kind: f.kind.clone(),
                    probability: f.probability,
                    action: action.to_string(),
                    steps: steps.iter().map(|s| s.to_string()).collect(),
                    estimated_minutes_saved,
                }
            })
            .collect()
    }
}

impl Default for ViolationForecaster {
    fn default() -> Self {
        Self::new(ForecasterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_metadata() -> ArtifactMetadata {
        ArtifactMetadata {
            document_id: "annual-report".to_string(),
            color_count: 9,
            font_count: 3,
            complexity_score: 0.8,
            page_count: 12,
            ..Default::default()
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_scenario_rows_and_gates() {
        let forecaster = ViolationForecaster::default();
        let output = ClassifierOutput { probability: 0.6, label: true };
        let forecast = forecaster.forecast_from_output(output, &scenario_metadata(), Utc::now());

        let rows: Vec<(ViolationKind, f64)> = forecast
            .all_forecasts
            .iter()
            .map(|f| (f.kind.clone(), f.probability))
            .collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].0, ViolationKind::ColorViolation);
        assert!(approx(rows[0].1, 0.48));
        assert_eq!(rows[1].0, ViolationKind::TypographyViolation);
        assert!(approx(rows[1].1, 0.42));
        assert_eq!(rows[2].0, ViolationKind::TextOverflow);
        assert!(approx(rows[2].1, 0.36));
        assert_eq!(rows[3].0, ViolationKind::SpacingInconsistency);
        assert!(approx(rows[3].1, 0.24));

        assert!(forecast.likely_violations.is_empty());
        assert_eq!(forecast.recommended_checks.len(), 4);
        assert!(forecast.prevention_strategies.is_empty());
        assert!(forecast.has_violations);
        assert!(approx(forecast.confidence, 0.6));
    }

    #[test]
    fn test_no_conditions_no_rows() {
        let rows = ViolationForecaster::type_forecasts(0.9, &ArtifactMetadata::new("plain"));
        assert!(rows.is_empty());
    }

    #[test]
    fn test_likely_violations_use_confidence_threshold() {
        let forecaster = ViolationForecaster::default();
        let output = ClassifierOutput { probability: 0.95, label: true };
        let forecast = forecaster.forecast_from_output(output, &scenario_metadata(), Utc::now());
        let likely: Vec<&ViolationKind> = forecast.likely_violations.iter().map(|f| &f.kind).collect();
        // 0.76 passes, 0.665 does not
        assert_eq!(likely, vec![&ViolationKind::ColorViolation]);
        assert_eq!(forecast.prevention_strategies.len(), 3);
        assert_eq!(forecast.prevention_strategies[0].steps.len(), 3);
    }

    #[test]
    fn test_checks_sorted_by_priority_with_stable_ties() {
        let forecaster = ViolationForecaster::default();
        let forecasts = vec![
            TypeForecast { kind: ViolationKind::SpacingInconsistency, probability: 0.9, reason: String::new() },
            TypeForecast { kind: ViolationKind::ColorViolation, probability: 0.8, reason: String::new() },
            TypeForecast { kind: ViolationKind::TypographyViolation, probability: 0.7, reason: String::new() },
            TypeForecast { kind: ViolationKind::ImageResolution, probability: 0.6, reason: String::new() },
            TypeForecast { kind: ViolationKind::TextOverflow, probability: 0.5, reason: String::new() },
        ];
        let checks = forecaster.recommend_checks(&forecasts);
        let order: Vec<CheckPriority> = checks.iter().map(|c| c.priority).collect();
        assert_eq!(
            order,
            vec![
                CheckPriority::Critical,
                CheckPriority::High,
                CheckPriority::High,
                CheckPriority::Medium,
                CheckPriority::Low
            ]
        );
        // both High rows keep input order: color before image
        assert_eq!(checks[1].kind, ViolationKind::ColorViolation);
        assert_eq!(checks[2].kind, ViolationKind::ImageResolution);
        for pair in checks.windows(2) {
            assert!(pair[0].priority <= pair[1].priority);
        }
    }

    #[test]
    fn test_unknown_kind_falls_back_to_manual_review() {
        let forecaster = ViolationForecaster::default();
        let forecasts = vec![TypeForecast {
            kind: ViolationKind::Other("bleed_missing".to_string()),
            probability: 0.8,
            reason: String::new(),
        }];
        let strategies = forecaster.prevention_strategies(&forecasts);
        assert_eq!(strategies.len(), 1);
        assert_eq!(strategies[0].action, "Manual review");
    }
}
