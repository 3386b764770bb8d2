//! Root-cause diagnosis
//!
//! Violations are grouped by category. A category recurring more often than
//! the systemic threshold is annotated from a static pattern catalog and gets
//! a recommendation; the rest are recorded as individual issues.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::prediction::CheckPriority;
use crate::types::{DetectionReport, Severity};

/// Share of a systemic category a targeted fix is expected to remove
pub const SYSTEMIC_REDUCTION_PERCENT: u32 = 80;

const UNKNOWN_CAUSES: &[&str] = &["Unknown cause"];
const UNKNOWN_FIXES: &[&str] = &["Manual review"];

struct IssuePattern {
    category: &'static str,
    causes: &'static [&'static str],
    fixes: &'static [&'static str],
}

/// Known causes and fixes per category
const PATTERN_CATALOG: &[IssuePattern] = &[
    IssuePattern {
        category: "color",
        causes: &["Colors defined outside the brand palette", "RGB swatches in a print document"],
        fixes: &["Replace swatches from the brand library", "Convert document swatches to CMYK"],
    },
    IssuePattern {
        category: "typography",
        causes: &["Missing or substituted fonts", "Local overrides of paragraph styles"],
        fixes: &["Substitute approved font families", "Clear overrides and reapply styles"],
    },
    IssuePattern {
        category: "layout",
        causes: &["Text frames sized for shorter copy", "Content placed outside margins"],
        fixes: &["Enable frame auto-sizing or reflow text", "Snap frames back to the margin guides"],
    },
    IssuePattern {
        category: "image",
        causes: &["Low-resolution source images", "Broken or modified links"],
        fixes: &["Relink to high-resolution sources", "Update modified links"],
    },
    IssuePattern {
        category: "spacing",
        causes: &["Manual spacing instead of master grid", "Inconsistent paragraph spacing"],
        fixes: &["Reapply master pages", "Normalise space before and after"],
    },
    IssuePattern {
        category: "accessibility",
        causes: &["Images without alternate text", "Insufficient text contrast"],
        fixes: &["Insert alternate text", "Adjust foreground and background contrast"],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Systemic,
    Individual,
}

/// One category's violations in this run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryIssue {
    pub category: String,
    pub count: usize,
    pub kind: IssueKind,
    pub critical: usize,
    /// Only populated for systemic issues
    #[serde(default)]
    pub causes: Vec<String>,
    #[serde(default)]
    pub fixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub priority: CheckPriority,
    pub action: String,
    pub expected_impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub systemic: Vec<CategoryIssue>,
    pub individual: Vec<CategoryIssue>,
    /// One per systemic issue, highest priority first
    pub recommendations: Vec<Recommendation>,
}

/// Group violations by category and classify each group
pub fn diagnose(report: &DetectionReport, systemic_threshold: usize) -> Diagnosis {
    let mut groups: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for v in report.violations.iter() {
        let entry = groups.entry(v.category.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if v.severity == Severity::Critical {
            entry.1 += 1;
        }
    }

    let mut diagnosis = Diagnosis::default();
    for (category, (count, critical)) in groups {
        if count <= systemic_threshold {
            diagnosis.individual.push(CategoryIssue {
                category: category.to_string(),
                count,
                kind: IssueKind::Individual,
                critical,
                causes: Vec::new(),
                fixes: Vec::new(),
            });
            continue;
        }

        let (causes, fixes) = PATTERN_CATALOG
            .iter()
            .find(|p| p.category == category)
            .map(|p| (p.causes, p.fixes))
            .unwrap_or((UNKNOWN_CAUSES, UNKNOWN_FIXES));
        diagnosis.systemic.push(CategoryIssue {
            category: category.to_string(),
            count,
            kind: IssueKind::Systemic,
            critical,
            causes: causes.iter().map(|s| s.to_string()).collect(),
            fixes: fixes.iter().map(|s| s.to_string()).collect(),
        });
    }

    diagnosis.systemic.sort_by(|a, b| b.count.cmp(&a.count));
    let mut recommendations: Vec<Recommendation> = diagnosis
        .systemic
        .iter()
        .map(|issue| Recommendation {
            category: issue.category.clone(),
            priority: if issue.critical > 0 { CheckPriority::Critical } else { CheckPriority::High },
            action: format!(
                "Address systemic {} issues: {}",
                issue.category,
                issue.fixes.first().map(String::as_str).unwrap_or("manual review")
            ),
            expected_impact: format!(
                "Reduce {} violations by {}%",
                issue.category, SYSTEMIC_REDUCTION_PERCENT
            ),
        })
        .collect();
    recommendations.sort_by_key(|r| r.priority);
    diagnosis.recommendations = recommendations;
    diagnosis
}
