//! Qualitative insights generated after a learning session

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::attempt::FixAttempt;
use super::failure::{FailureCategory, StrategyImprovement};
use super::technique::Technique;

/// Minimum failures before the dominant failure category is reported
pub const FAILURE_PATTERN_MIN: usize = 3;
/// Minimum session attempts before a technique gets its own summary
pub const TECHNIQUE_SUMMARY_MIN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    SuccessRate,
    Efficiency,
    FailurePattern,
    TechniqueEffectiveness,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
    #[serde(default)]
    pub technique: Option<Technique>,
}

impl Insight {
    fn new(kind: InsightKind, message: String) -> Self {
        Self {
            kind,
            message,
            technique: None,
        }
    }
}

/// Result of `learn_from_fixes`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningReport {
    pub fixes_analyzed: usize,
    /// Distinct techniques whose profile changed this session
    pub strategies_improved: usize,
    /// Mean success rate after the session minus mean before
    pub accuracy_gain: f64,
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub improvements: Vec<StrategyImprovement>,
}

/// Build the insight list for one session's attempts.
///
/// `manual_fix_minutes` is the per-fix manual baseline used for the
/// efficiency comparison.
pub fn generate_insights(
    attempts: &[FixAttempt],
    improvements: &[StrategyImprovement],
    manual_fix_minutes: f64,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    if attempts.is_empty() {
        return insights;
    }

    let total = attempts.len();
    let successes = attempts.iter().filter(|a| a.success).count();
    let rate = successes as f64 / total as f64 * 100.0;
    insights.push(Insight::new(
        InsightKind::SuccessRate,
        format!("{}/{} fixes succeeded ({:.1}% success rate)", successes, total, rate),
    ));

    let automated_minutes = attempts.iter().map(|a| a.elapsed_ms as f64).sum::<f64>() / 60_000.0;
    let manual_minutes = manual_fix_minutes * total as f64;
    let saved = manual_minutes - automated_minutes;
    insights.push(Insight::new(
        InsightKind::Efficiency,
        format!(
            "Automated fixes took {:.1} min vs ~{:.0} min manually ({:.1} min saved)",
            automated_minutes, manual_minutes, saved
        ),
    ));

    if improvements.len() >= FAILURE_PATTERN_MIN {
        let mut counts: BTreeMap<FailureCategory, usize> = BTreeMap::new();
        for imp in improvements {
            *counts.entry(imp.category).or_insert(0) += 1;
        }
        // max_by_key keeps the last maximum; iterate reversed so ties go to the first category
        if let Some((category, count)) = counts.iter().rev().max_by_key(|(_, c)| **c) {
            insights.push(Insight::new(
                InsightKind::FailurePattern,
                format!(
                    "Most frequent failure: {} ({} of {} failures)",
                    category,
                    count,
                    improvements.len()
                ),
            ));
        }
    }

    let mut per_technique: HashMap<&Technique, (usize, usize, u64)> = HashMap::new();
    for attempt in attempts {
        let entry = per_technique.entry(&attempt.technique).or_insert((0, 0, 0));
        entry.0 += 1;
        if attempt.success {
            entry.1 += 1;
        }
        entry.2 += attempt.elapsed_ms;
    }
    let mut summaries: Vec<_> = per_technique
        .into_iter()
        .filter(|(_, (n, _, _))| *n >= TECHNIQUE_SUMMARY_MIN)
        .collect();
    summaries.sort_by(|a, b| a.0.cmp(b.0));
    for (technique, (n, ok, elapsed)) in summaries {
        let rate = ok as f64 / n as f64 * 100.0;
        let label = if rate >= 80.0 {
            "highly effective"
        } else if rate >= 50.0 {
            "moderately effective"
        } else {
            "needs attention"
        };
        insights.push(Insight {
            kind: InsightKind::TechniqueEffectiveness,
            message: format!(
                "{} is {}: {}/{} succeeded, avg {:.0}ms",
                technique,
                label,
                ok,
                n,
                elapsed as f64 / n as f64
            ),
            technique: Some(technique.clone()),
        });
    }

    insights
}
