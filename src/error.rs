//! Engine error taxonomy
//!
//! Insufficient data and missing models are not errors; they are logged and
//! leave prior state in place. Only collaborator failures and persistence
//! failures surface here.

use std::fmt;

/// Pipeline phase, used to tag collaborator failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Predict,
    Detect,
    Diagnose,
    Decide,
    Deploy,
    Verify,
    Learn,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Predict => "predict",
            Phase::Detect => "detect",
            Phase::Diagnose => "diagnose",
            Phase::Decide => "decide",
            Phase::Deploy => "deploy",
            Phase::Verify => "verify",
            Phase::Learn => "learn",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Errors raised by the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// An external Detector/Planner/Executor call failed; fatal to the run
    #[error("{phase} phase failed: {source}")]
    Collaborator {
        phase: Phase,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn collaborator(phase: Phase, source: anyhow::Error) -> Self {
        EngineError::Collaborator { phase, source }
    }

    /// Phase that aborted the run, if this was a collaborator failure
    pub fn phase(&self) -> Option<Phase> {
        match self {
            EngineError::Collaborator { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_surfaces_source_verbatim() {
        let err = EngineError::collaborator(Phase::Detect, anyhow::anyhow!("detector offline"));
        assert_eq!(err.to_string(), "detect phase failed: detector offline");
        assert_eq!(err.phase(), Some(Phase::Detect));
    }

    #[test]
    fn test_config_error_has_no_phase() {
        let err = EngineError::Config("bad threshold".to_string());
        assert!(err.phase().is_none());
    }
}
