//! Strategy performance tracker
//!
//! Two update rules act on the same profile:
//! - after every attempt, fast incremental reinforcement or decay
//! - periodically, an authoritative recomputation from the attempt log that
//!   overwrites whatever the incremental rule produced
//!
//! The tracker itself is pure in-memory state; the caller supplies attempts
//! read from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use super::attempt::FixAttempt;
use super::failure::StrategyImprovement;
use super::technique::Technique;
use crate::config::TrackerConfig;

pub const MIN_RATE: f64 = 0.1;
pub const MAX_RATE: f64 = 1.0;
const SUCCESS_CONFIDENCE_STEP: f64 = 0.01;
const FAILURE_CONFIDENCE_STEP: f64 = 0.02;
/// Recomputed confidence reaches 1.0 at this many samples
const FULL_CONFIDENCE_SAMPLES: f64 = 100.0;

fn clamp_rate(value: f64) -> f64 {
    value.clamp(MIN_RATE, MAX_RATE)
}

/// Which rule produced a profile change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Reinforced,
    Decayed,
    Recomputed,
}

/// One entry in a profile's improvement log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementRecord {
    pub at: DateTime<Utc>,
    pub kind: UpdateKind,
    pub success_rate_before: f64,
    pub success_rate_after: f64,
    pub confidence_after: f64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Performance summary of one technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub technique: Technique,
    /// Always within [0.1, 1.0]
    pub success_rate: f64,
    pub avg_time_ms: f64,
    /// Always within [0.1, 1.0]
    pub confidence: f64,
    /// Attempts seen by the incremental rule
    #[serde(default)]
    pub attempts: u64,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub improvements: Vec<ImprovementRecord>,
}

impl StrategyProfile {
    pub fn with_defaults(technique: Technique, now: DateTime<Utc>) -> Self {
        let defaults = technique.defaults();
        Self {
            technique,
            success_rate: defaults.success_rate,
            avg_time_ms: defaults.avg_time_ms,
            confidence: defaults.confidence,
            attempts: 0,
            updated_at: now,
            improvements: Vec::new(),
        }
    }

    /// Append a record, keeping at most `limit` of the newest
    fn log(&mut self, kind: UpdateKind, before: f64, note: Option<String>, now: DateTime<Utc>, limit: usize) {
        self.updated_at = now;
        self.improvements.push(ImprovementRecord {
            at: now,
            kind,
            success_rate_before: before,
            success_rate_after: self.success_rate,
            confidence_after: self.confidence,
            note,
        });
        if self.improvements.len() > limit {
            let excess = self.improvements.len() - limit;
            self.improvements.drain(..excess);
        }
    }
}

/// Per-technique profiles with both update rules
#[derive(Debug, Clone)]
pub struct StrategyTracker {
    config: TrackerConfig,
    profiles: HashMap<Technique, StrategyProfile>,
}

impl StrategyTracker {
    /// Tracker seeded with the documented defaults for every known technique
    pub fn new(config: TrackerConfig) -> Self {
        let now = Utc::now();
        let profiles = Technique::known()
            .iter()
            .map(|t| (t.clone(), StrategyProfile::with_defaults(t.clone(), now)))
            .collect();
        Self { config, profiles }
    }

    /// Defaults overlaid with previously persisted profiles
    pub fn with_profiles(config: TrackerConfig, persisted: impl IntoIterator<Item = StrategyProfile>) -> Self {
        let mut tracker = Self::new(config);
        for profile in persisted {
            tracker.profiles.insert(profile.technique.clone(), profile);
        }
        tracker
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn profile(&self, technique: &Technique) -> Option<&StrategyProfile> {
        self.profiles.get(technique)
    }

    /// All profiles, best success rate first
    pub fn profiles(&self) -> Vec<&StrategyProfile> {
        let mut profiles: Vec<&StrategyProfile> = self.profiles.values().collect();
        profiles.sort_by(|a, b| {
            b.success_rate
                .partial_cmp(&a.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.technique.cmp(&b.technique))
        });
        profiles
    }

    /// Every technique with a profile, in key order
    pub fn techniques(&self) -> Vec<Technique> {
        let keys: BTreeSet<&Technique> = self.profiles.keys().collect();
        keys.into_iter().cloned().collect()
    }

    /// Mean success rate across all profiles
    pub fn mean_success_rate(&self) -> f64 {
        if self.profiles.is_empty() {
            return 0.0;
        }
        self.profiles.values().map(|p| p.success_rate).sum::<f64>() / self.profiles.len() as f64
    }

    fn entry(&mut self, technique: &Technique, now: DateTime<Utc>) -> &mut StrategyProfile {
        self.profiles.entry(technique.clone()).or_insert_with(|| {
            info!("New technique '{}' registered with neutral profile", technique);
            StrategyProfile::with_defaults(technique.clone(), now)
        })
    }

    /// Exponential reinforcement: r + α(1 − r), confidence +0.01
    pub fn on_success(&mut self, technique: &Technique, now: DateTime<Utc>) -> &StrategyProfile {
        let alpha = self.config.learning_rate;
        let limit = self.config.profile_log_limit;
        let profile = self.entry(technique, now);
        let before = profile.success_rate;
        profile.success_rate = clamp_rate(before + alpha * (1.0 - before));
        profile.confidence = clamp_rate(profile.confidence + SUCCESS_CONFIDENCE_STEP);
        profile.attempts += 1;
        profile.log(UpdateKind::Reinforced, before, None, now, limit);
        debug!(
            "Reinforced {}: {:.3} -> {:.3}",
            technique, before, profile.success_rate
        );
        profile
    }

    /// Proportional decay: max(0.1, r − αr), confidence −0.02.
    ///
    /// Returns the advisory suggestion for the classified error.
    pub fn on_failure(
        &mut self,
        technique: &Technique,
        error: Option<&str>,
        now: DateTime<Utc>,
    ) -> StrategyImprovement {
        let alpha = self.config.learning_rate;
        let limit = self.config.profile_log_limit;
        let improvement = StrategyImprovement::for_failure(technique.clone(), error, now);
        let profile = self.entry(technique, now);
        let before = profile.success_rate;
        profile.success_rate = clamp_rate(before - alpha * before);
        profile.confidence = clamp_rate(profile.confidence - FAILURE_CONFIDENCE_STEP);
        profile.attempts += 1;
        profile.log(
            UpdateKind::Decayed,
            before,
            Some(format!("{}: {}", improvement.category, improvement.suggestion)),
            now,
            limit,
        );
        debug!(
            "Decayed {} ({}): {:.3} -> {:.3}",
            technique, improvement.category, before, profile.success_rate
        );
        improvement
    }

    /// Authoritative recomputation from recent attempts, newest first.
    ///
    /// Reads at most `recompute_window` attempts for `technique` and returns
    /// false without touching the profile when fewer than `min_attempts` are
    /// available. Otherwise success rate, mean time, and confidence are
    /// overwritten; a record is logged only when one of them changed.
    pub fn recompute_profile(
        &mut self,
        technique: &Technique,
        recent: &[FixAttempt],
        now: DateTime<Utc>,
    ) -> bool {
        let window: Vec<&FixAttempt> = recent
            .iter()
            .filter(|a| &a.technique == technique)
            .take(self.config.recompute_window)
            .collect();

        if window.len() < self.config.min_attempts {
            debug!(
                "Skipping recomputation for {}: {} attempts (need {})",
                technique,
                window.len(),
                self.config.min_attempts
            );
            return false;
        }

        let count = window.len() as f64;
        let successes = window.iter().filter(|a| a.success).count() as f64;
        let mean_time = window.iter().map(|a| a.elapsed_ms as f64).sum::<f64>() / count;

        let success_rate = clamp_rate(successes / count);
        let confidence = clamp_rate((count / FULL_CONFIDENCE_SAMPLES).min(1.0));
        let limit = self.config.profile_log_limit;

        let profile = self.entry(technique, now);
        if (profile.success_rate, profile.avg_time_ms, profile.confidence)
            == (success_rate, mean_time, confidence)
        {
            debug!("Recomputed {} unchanged", technique);
            return true;
        }
        let before = profile.success_rate;
        profile.success_rate = success_rate;
        profile.avg_time_ms = mean_time;
        profile.confidence = confidence;
        profile.log(
            UpdateKind::Recomputed,
            before,
            Some(format!("recomputed from {} attempts", window.len())),
            now,
            limit,
        );
        info!(
            "Recomputed {} from {} attempts: success {:.3}, avg {:.0}ms",
            technique,
            window.len(),
            profile.success_rate,
            profile.avg_time_ms
        );
        true
    }
}

impl Default for StrategyTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_seeded_with_known_techniques() {
        let tracker = StrategyTracker::default();
        for technique in Technique::known() {
            let profile = tracker.profile(technique).unwrap();
            assert_eq!(profile.success_rate, technique.defaults().success_rate);
        }
        assert!(tracker.profile(&Technique::from("svg_minify")).is_none());
    }

    #[test]
    fn test_on_success_reinforcement_formula() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::TextReflow;
        let r = tracker.profile(&t).unwrap().success_rate;
        let c = tracker.profile(&t).unwrap().confidence;
        let profile = tracker.on_success(&t, Utc::now());
        assert!(approx(profile.success_rate, r + 0.1 * (1.0 - r)));
        assert!(approx(profile.confidence, c + 0.01));
        assert_eq!(profile.improvements.len(), 1);
        assert_eq!(profile.improvements[0].kind, UpdateKind::Reinforced);
    }

    #[test]
    fn test_on_success_never_exceeds_one() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::ColorReplace;
        for _ in 0..500 {
            tracker.on_success(&t, Utc::now());
        }
        let profile = tracker.profile(&t).unwrap();
        assert!(profile.success_rate <= 1.0);
        assert!(profile.confidence <= 1.0);
    }

    #[test]
    fn test_on_failure_decay_formula_and_floor() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::ImageRelink;
        let r = tracker.profile(&t).unwrap().success_rate;
        let imp = tracker.on_failure(&t, Some("request timed out"), Utc::now());
        assert_eq!(imp.category, crate::strategy::FailureCategory::Timeout);
        assert!(approx(tracker.profile(&t).unwrap().success_rate, (r - 0.1 * r).max(0.1)));

        for _ in 0..200 {
            tracker.on_failure(&t, None, Utc::now());
        }
        let profile = tracker.profile(&t).unwrap();
        assert_eq!(profile.success_rate, MIN_RATE);
        assert_eq!(profile.confidence, MIN_RATE);
    }

    #[test]
    fn test_unknown_technique_gets_neutral_profile() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::from("svg_minify");
        let profile = tracker.on_success(&t, Utc::now());
        assert!(approx(profile.success_rate, 0.5 + 0.1 * 0.5));
        assert_eq!(profile.avg_time_ms, 5000.0);
        assert!(approx(profile.confidence, 0.51));
    }

    #[test]
    fn test_recompute_overwrites_incremental_value() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::ColorReplace;
        for _ in 0..20 {
            tracker.on_success(&t, Utc::now());
        }
        assert!(tracker.profile(&t).unwrap().success_rate > 0.95);

        let attempts: Vec<FixAttempt> = (0..10)
            .map(|i| FixAttempt::new(t.clone(), "color_violation", i < 8, 1000 + i as u64 * 100))
            .collect();
        assert!(tracker.recompute_profile(&t, &attempts, Utc::now()));

        let profile = tracker.profile(&t).unwrap();
        assert_eq!(profile.success_rate, 0.8);
        assert_eq!(profile.avg_time_ms, 1450.0);
        assert!(approx(profile.confidence, 0.1));
        assert_eq!(profile.improvements.last().unwrap().kind, UpdateKind::Recomputed);
    }

    #[test]
    fn test_recompute_requires_minimum_attempts() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::GridSnap;
        let before = tracker.profile(&t).unwrap().clone();
        let attempts: Vec<FixAttempt> = (0..4)
            .map(|_| FixAttempt::new(t.clone(), "grid", false, 10))
            .collect();
        assert!(!tracker.recompute_profile(&t, &attempts, Utc::now()));
        assert_eq!(tracker.profile(&t).unwrap(), &before);
    }

    #[test]
    fn test_recompute_respects_window_and_technique() {
        let config = TrackerConfig {
            recompute_window: 5,
            min_attempts: 5,
            ..Default::default()
        };
        let mut tracker = StrategyTracker::new(config);
        let t = Technique::SpacingNormalize;
        let mut attempts: Vec<FixAttempt> = (0..5)
            .map(|_| FixAttempt::new(t.clone(), "spacing", true, 100))
            .collect();
        // older failures outside the window, plus another technique
        attempts.extend((0..5).map(|_| FixAttempt::new(t.clone(), "spacing", false, 100)));
        attempts.insert(0, FixAttempt::new(Technique::GridSnap, "grid", false, 100));

        assert!(tracker.recompute_profile(&t, &attempts, Utc::now()));
        assert_eq!(tracker.profile(&t).unwrap().success_rate, 1.0);
    }

    #[test]
    fn test_recompute_all_failures_clamps_to_floor() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::AltTextInsert;
        let attempts: Vec<FixAttempt> = (0..6)
            .map(|_| FixAttempt::new(t.clone(), "alt", false, 10))
            .collect();
        assert!(tracker.recompute_profile(&t, &attempts, Utc::now()));
        assert_eq!(tracker.profile(&t).unwrap().success_rate, MIN_RATE);
    }

    #[test]
    fn test_unchanged_recompute_is_not_logged() {
        let mut tracker = StrategyTracker::default();
        let t = Technique::ColorReplace;
        let attempts: Vec<FixAttempt> = (0..5)
            .map(|_| FixAttempt::new(t.clone(), "color_violation", true, 200))
            .collect();
        assert!(tracker.recompute_profile(&t, &attempts, Utc::now()));
        assert_eq!(tracker.profile(&t).unwrap().improvements.len(), 1);

        for _ in 0..100 {
            assert!(tracker.recompute_profile(&t, &attempts, Utc::now()));
        }
        assert_eq!(tracker.profile(&t).unwrap().improvements.len(), 1);
    }

    #[test]
    fn test_profile_log_is_capped() {
        let config = TrackerConfig {
            profile_log_limit: 10,
            ..Default::default()
        };
        let mut tracker = StrategyTracker::new(config);
        let t = Technique::FontSubstitution;
        for _ in 0..25 {
            tracker.on_success(&t, Utc::now());
        }
        tracker.on_failure(&t, None, Utc::now());
        let profile = tracker.profile(&t).unwrap();
        assert_eq!(profile.improvements.len(), 10);
        assert_eq!(profile.improvements.last().unwrap().kind, UpdateKind::Decayed);
        assert_eq!(profile.attempts, 26);
    }

    #[test]
    fn test_with_profiles_overrides_defaults() {
        let mut custom = StrategyProfile::with_defaults(Technique::ColorReplace, Utc::now());
        custom.success_rate = 0.42;
        let tracker = StrategyTracker::with_profiles(TrackerConfig::default(), vec![custom]);
        assert_eq!(tracker.profile(&Technique::ColorReplace).unwrap().success_rate, 0.42);
        assert_eq!(tracker.techniques().len(), Technique::known().len());
    }
}
