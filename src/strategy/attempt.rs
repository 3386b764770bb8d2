//! Fix execution records
//!
//! `FixResult` is what the external executor reports; `FixAttempt` is the
//! immutable audit record appended to the attempt log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::technique::Technique;
use crate::types::Violation;

/// One planned fix: a technique aimed at a violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixDescriptor {
    pub technique: Technique,
    pub violation: Violation,
    /// Executor-specific parameters
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl FixDescriptor {
    pub fn new(technique: Technique, violation: Violation) -> Self {
        Self {
            technique,
            violation,
            parameters: serde_json::Value::Null,
        }
    }
}

/// Executor outcome for one fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixResult {
    pub fix: FixDescriptor,
    pub elapsed_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    /// When the executor finished this fix, if it reports it
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl FixResult {
    pub fn succeeded(fix: FixDescriptor, elapsed_ms: u64) -> Self {
        Self {
            fix,
            elapsed_ms,
            error: None,
            completed_at: None,
        }
    }

    pub fn failed(fix: FixDescriptor, elapsed_ms: u64, error: impl Into<String>) -> Self {
        Self {
            fix,
            elapsed_ms,
            error: Some(error.into()),
            completed_at: None,
        }
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }
}

/// Successes and failures from one deploy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixResults {
    #[serde(default)]
    pub success: Vec<FixResult>,
    #[serde(default)]
    pub failed: Vec<FixResult>,
}

impl FixResults {
    pub fn len(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Audit records for every result, oldest first.
    ///
    /// Results are ordered by `completed_at`, falling back to `batch_at`.
    /// Ties are broken by relative position within each list, so a batch
    /// without timestamps interleaves successes and failures evenly instead
    /// of placing one outcome after the other.
    pub fn to_attempts(&self, batch_at: DateTime<Utc>) -> Vec<FixAttempt> {
        let mut keyed: Vec<(DateTime<Utc>, f64, FixAttempt)> = Vec::with_capacity(self.len());
        for (results, success) in [(&self.success, true), (&self.failed, false)] {
            let n = results.len() as f64;
            for (i, result) in results.iter().enumerate() {
                let at = result.completed_at.unwrap_or(batch_at);
                let position = (i as f64 + 0.5) / n;
                keyed.push((at, position, FixAttempt::from_result(result, success, at)));
            }
        }
        keyed.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });
        keyed.into_iter().map(|(_, _, attempt)| attempt).collect()
    }
}

/// A single execution of one technique against one violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixAttempt {
    pub id: String,
    pub technique: Technique,
    pub violation_type: String,
    pub success: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl FixAttempt {
    pub fn new(technique: Technique, violation_type: impl Into<String>, success: bool, elapsed_ms: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            technique,
            violation_type: violation_type.into(),
            success,
            elapsed_ms,
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    fn from_result(result: &FixResult, success: bool, attempted_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            technique: result.fix.technique.clone(),
            violation_type: result.fix.violation.violation_type.clone(),
            success,
            elapsed_ms: result.elapsed_ms,
            error: if success { None } else { result.error.clone() },
            attempted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    #[test]
    fn test_results_to_attempts() {
        let violation = Violation::new("color_violation", "color", Severity::Major, "p1");
        let results = FixResults {
            success: vec![FixResult::succeeded(
                FixDescriptor::new(Technique::ColorReplace, violation.clone()),
                120,
            )],
            failed: vec![FixResult::failed(
                FixDescriptor::new(Technique::from("svg_minify"), violation),
                900,
                "operation timed out",
            )],
        };
        let now = Utc::now();
        let attempts = results.to_attempts(now);
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].success);
        assert_eq!(attempts[0].technique, Technique::ColorReplace);
        assert!(attempts[0].error.is_none());
        assert!(!attempts[1].success);
        assert_eq!(attempts[1].error.as_deref(), Some("operation timed out"));
        assert_eq!(attempts[1].violation_type, "color_violation");
        assert_ne!(attempts[0].id, attempts[1].id);
        assert_eq!(attempts[1].attempted_at, now);
    }

    fn batch(successes: usize, failures: usize) -> FixResults {
        let fix = FixDescriptor::new(
            Technique::ColorReplace,
            Violation::new("color_violation", "color", Severity::Major, "p1"),
        );
        FixResults {
            success: (0..successes).map(|_| FixResult::succeeded(fix.clone(), 100)).collect(),
            failed: (0..failures).map(|_| FixResult::failed(fix.clone(), 100, "timeout")).collect(),
        }
    }

    #[test]
    fn test_untimed_batch_interleaves_outcomes() {
        let attempts = batch(50, 50).to_attempts(Utc::now());
        assert_eq!(attempts.len(), 100);
        // any newest-first window holds both outcomes in proportion
        let newest: Vec<&FixAttempt> = attempts.iter().rev().take(50).collect();
        assert_eq!(newest.iter().filter(|a| a.success).count(), 25);

        let attempts = batch(8, 2).to_attempts(Utc::now());
        let newest: Vec<&FixAttempt> = attempts.iter().rev().take(5).collect();
        assert_eq!(newest.iter().filter(|a| !a.success).count(), 1);
    }

    #[test]
    fn test_completed_at_orders_across_lists() {
        let start = Utc::now();
        let mut results = batch(2, 1);
        results.success[0] = results.success[0].clone().completed_at(start);
        results.failed[0] = results.failed[0].clone().completed_at(start + chrono::Duration::seconds(1));
        results.success[1] = results.success[1].clone().completed_at(start + chrono::Duration::seconds(2));

        let attempts = results.to_attempts(start);
        let outcomes: Vec<bool> = attempts.iter().map(|a| a.success).collect();
        assert_eq!(outcomes, vec![true, false, true]);
        assert_eq!(attempts[1].attempted_at, start + chrono::Duration::seconds(1));
    }
}
