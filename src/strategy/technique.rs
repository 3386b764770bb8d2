//! Remediation techniques
//!
//! Known techniques are a closed set with documented default profiles.
//! Anything else the executor reports becomes `Technique::Custom` and starts
//! from the neutral profile.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named remediation method with a tracked performance profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Technique {
    ColorReplace,
    FontSubstitution,
    TextReflow,
    ImageRelink,
    SpacingNormalize,
    ContrastAdjust,
    AltTextInsert,
    GridSnap,
    Custom(String),
}

/// Starting values for a technique's profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileDefaults {
    pub success_rate: f64,
    pub avg_time_ms: f64,
    pub confidence: f64,
}

/// Profile given to techniques seen for the first time at runtime
pub const UNKNOWN_TECHNIQUE_DEFAULTS: ProfileDefaults = ProfileDefaults {
    success_rate: 0.5,
    avg_time_ms: 5000.0,
    confidence: 0.5,
};

impl Technique {
    /// Every built-in technique
    pub fn known() -> &'static [Technique] {
        &[
            Technique::ColorReplace,
            Technique::FontSubstitution,
            Technique::TextReflow,
            Technique::ImageRelink,
            Technique::SpacingNormalize,
            Technique::ContrastAdjust,
            Technique::AltTextInsert,
            Technique::GridSnap,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Technique::ColorReplace => "color_replace",
            Technique::FontSubstitution => "font_substitution",
            Technique::TextReflow => "text_reflow",
            Technique::ImageRelink => "image_relink",
            Technique::SpacingNormalize => "spacing_normalize",
            Technique::ContrastAdjust => "contrast_adjust",
            Technique::AltTextInsert => "alt_text_insert",
            Technique::GridSnap => "grid_snap",
            Technique::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Technique::Custom(_))
    }

    pub fn defaults(&self) -> ProfileDefaults {
        let (success_rate, avg_time_ms, confidence) = match self {
            Technique::ColorReplace => (0.9, 1500.0, 0.8),
            Technique::FontSubstitution => (0.85, 2000.0, 0.75),
            Technique::TextReflow => (0.7, 4000.0, 0.6),
            Technique::ImageRelink => (0.6, 8000.0, 0.5),
            Technique::SpacingNormalize => (0.8, 2500.0, 0.7),
            Technique::ContrastAdjust => (0.85, 1800.0, 0.7),
            Technique::AltTextInsert => (0.75, 6000.0, 0.6),
            Technique::GridSnap => (0.8, 2200.0, 0.65),
            Technique::Custom(_) => return UNKNOWN_TECHNIQUE_DEFAULTS,
        };
        ProfileDefaults {
            success_rate,
            avg_time_ms,
            confidence,
        }
    }
}

impl From<String> for Technique {
    fn from(s: String) -> Self {
        match s.as_str() {
            "color_replace" => Technique::ColorReplace,
            "font_substitution" => Technique::FontSubstitution,
            "text_reflow" => Technique::TextReflow,
            "image_relink" => Technique::ImageRelink,
            "spacing_normalize" => Technique::SpacingNormalize,
            "contrast_adjust" => Technique::ContrastAdjust,
            "alt_text_insert" => Technique::AltTextInsert,
            "grid_snap" => Technique::GridSnap,
            _ => Technique::Custom(s),
        }
    }
}

impl From<&str> for Technique {
    fn from(s: &str) -> Self {
        Technique::from(s.to_string())
    }
}

impl From<Technique> for String {
    fn from(technique: Technique) -> Self {
        technique.as_str().to_string()
    }
}

impl fmt::Display for Technique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_roundtrip_through_strings() {
        for technique in Technique::known() {
            assert_eq!(&Technique::from(technique.as_str()), technique);
            assert!(!technique.is_custom());
        }
    }

    #[test]
    fn test_unknown_key_is_custom_with_neutral_defaults() {
        let t = Technique::from("svg_minify");
        assert_eq!(t, Technique::Custom("svg_minify".to_string()));
        assert_eq!(t.defaults(), UNKNOWN_TECHNIQUE_DEFAULTS);
    }

    #[test]
    fn test_serde_uses_key_strings() {
        let json = serde_json::to_string(&vec![Technique::GridSnap, Technique::from("x")]).unwrap();
        assert_eq!(json, r#"["grid_snap","x"]"#);
    }
}
