//! Before/after comparison keyed by (type, location)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{DetectionReport, Violation, ViolationKey};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub violations_before: usize,
    pub violations_after: usize,
    /// In before, not in after; one per key
    pub resolved: Vec<Violation>,
    /// In after, not in before; one per key
    pub regressions: Vec<Violation>,
    /// No critical violations remain
    pub critical_clear: bool,
}

pub fn verify(before: &DetectionReport, after: &DetectionReport) -> VerificationResult {
    let before_keys: HashSet<ViolationKey> = before.violations.iter().map(Violation::key).collect();
    let after_keys: HashSet<ViolationKey> = after.violations.iter().map(Violation::key).collect();

    let resolved = difference(before, &after_keys);
    let regressions = difference(after, &before_keys);

    VerificationResult {
        violations_before: before.violations.len(),
        violations_after: after.violations.len(),
        resolved,
        regressions,
        critical_clear: after.violations.critical.is_empty(),
    }
}

/// First violation per key in `report` whose key is absent from `exclude`
fn difference(report: &DetectionReport, exclude: &HashSet<ViolationKey>) -> Vec<Violation> {
    let mut seen = HashSet::new();
    report
        .violations
        .iter()
        .filter(|v| {
            let key = v.key();
            !exclude.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}
