//! Domain error types.

use std::path::PathBuf;

/// Stage of the engine that rejected its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PriceSeries,
    ReturnDerivation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::PriceSeries => write!(f, "price series"),
            Stage::ReturnDerivation => write!(f, "return derivation"),
        }
    }
}

/// Top-level error type for backtest-coach.
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("invalid input ({stage}): {reason}")]
    InvalidInput { stage: Stage, reason: String },

    #[error("price data error in {source_name}: {reason}")]
    PriceData { source_name: String, reason: String },

    #[error("failed to write artifact {}: {reason}", path.display())]
    ArtifactWrite { path: PathBuf, reason: String },

    #[error("suggestion generation failed: {reason}")]
    UpstreamGeneration { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoachError {
    pub fn invalid_input(stage: Stage, reason: impl Into<String>) -> Self {
        CoachError::InvalidInput {
            stage,
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's data rather than the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoachError::InvalidInput { .. } | CoachError::PriceData { .. }
        )
    }

    /// Process exit status for this error kind.
    pub fn exit_status(&self) -> u8 {
        match self {
            CoachError::Io(_) | CoachError::ArtifactWrite { .. } => 1,
            CoachError::ConfigParse { .. }
            | CoachError::ConfigMissing { .. }
            | CoachError::ConfigInvalid { .. } => 2,
            CoachError::Database { .. } | CoachError::DatabaseQuery { .. } => 3,
            CoachError::InvalidInput { .. } | CoachError::PriceData { .. } => 4,
            CoachError::UpstreamGeneration { .. } => 6,
        }
    }
}

impl From<&CoachError> for std::process::ExitCode {
    fn from(err: &CoachError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
