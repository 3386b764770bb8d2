//! Failure classification
//!
//! Fix errors are normal input, not engine errors. Each one is classified by
//! ordered substring match and mapped to an advisory improvement suggestion
//! that is recorded but never applied automatically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::technique::Technique;

/// Coarse cause of a failed fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Timeout,
    ResourceMissing,
    Permissions,
    SyntaxError,
    Other,
}

impl FailureCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCategory::Timeout => "timeout",
            FailureCategory::ResourceMissing => "resource_missing",
            FailureCategory::Permissions => "permissions",
            FailureCategory::SyntaxError => "syntax_error",
            FailureCategory::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "timeout" => FailureCategory::Timeout,
            "resource_missing" => FailureCategory::ResourceMissing,
            "permissions" => FailureCategory::Permissions,
            "syntax_error" => FailureCategory::SyntaxError,
            _ => FailureCategory::Other,
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Checked in order; first match wins
const CLASSIFICATION_PATTERNS: &[(FailureCategory, &[&str])] = &[
    (FailureCategory::Timeout, &["timeout", "timed out", "deadline exceeded"]),
    (
        FailureCategory::ResourceMissing,
        &["not found", "missing", "no such file", "enoent", "unavailable"],
    ),
    (
        FailureCategory::Permissions,
        &["permission", "access denied", "eacces", "read-only", "locked"],
    ),
    (FailureCategory::SyntaxError, &["syntax", "parse", "unexpected token", "malformed"]),
];

/// Classify error text; `None` or unmatched text is `Other`
pub fn classify_error(error: Option<&str>) -> FailureCategory {
    let Some(error) = error else {
        return FailureCategory::Other;
    };
    let lower = error.to_lowercase();
    CLASSIFICATION_PATTERNS
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| lower.contains(p)))
        .map(|(category, _)| *category)
        .unwrap_or(FailureCategory::Other)
}

/// Canned suggestion and estimated success-rate impact per category
fn suggestion_for(category: FailureCategory) -> (&'static str, f64) {
    match category {
        FailureCategory::Timeout => (
            "Increase the execution timeout or split the fix into smaller batches",
            0.15,
        ),
        FailureCategory::ResourceMissing => (
            "Verify referenced assets exist before applying the fix",
            0.12,
        ),
        FailureCategory::Permissions => (
            "Check document and layer lock state before applying the fix",
            0.10,
        ),
        FailureCategory::SyntaxError => (
            "Validate generated script syntax before execution",
            0.08,
        ),
        FailureCategory::Other => ("Log full context and review the failure manually", 0.05),
    }
}

/// Advisory output produced for every classified failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyImprovement {
    pub technique: Technique,
    pub category: FailureCategory,
    pub suggestion: String,
    /// Expected success-rate gain if applied, 0.05-0.15
    pub estimated_impact: f64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StrategyImprovement {
    pub fn for_failure(technique: Technique, error: Option<&str>, now: DateTime<Utc>) -> Self {
        let category = classify_error(error);
        let (suggestion, estimated_impact) = suggestion_for(category);
        Self {
            technique,
            category,
            suggestion: suggestion.to_string(),
            estimated_impact,
            error: error.map(|e| e.chars().take(300).collect()),
            created_at: now,
        }
    }
}
