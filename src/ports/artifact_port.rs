//! Equity-curve artifact sink port.

use crate::domain::equity::EquityCurve;
use crate::domain::error::CoachError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArtifactFormat {
    #[default]
    Svg,
    Json,
}

impl ArtifactFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "svg",
            ArtifactFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactFormat::Svg => "image/svg+xml",
            ArtifactFormat::Json => "application/json",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArtifactFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "svg" => Ok(ArtifactFormat::Svg),
            "json" => Ok(ArtifactFormat::Json),
            other => Err(format!("unknown artifact format '{other}' (expected svg or json)")),
        }
    }
}

/// Where an artifact ended up. `name` is the file name, used as the
/// logical identifier when the artifact is exposed to clients.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactRef {
    pub name: String,
    pub path: PathBuf,
}

pub trait ArtifactPort {
    fn format(&self) -> ArtifactFormat;

    /// Write `curve` as `{stem}.{ext}` and report where it landed.
    fn write_equity_curve(&self, curve: &EquityCurve, stem: &str) -> Result<ArtifactRef, CoachError>;
}
