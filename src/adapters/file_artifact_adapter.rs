//! Filesystem artifact adapter: writes the equity curve as SVG or JSON.

use crate::adapters::chart_svg::render_equity_svg;
use crate::domain::equity::EquityCurve;
use crate::domain::error::CoachError;
use crate::ports::artifact_port::{ArtifactFormat, ArtifactPort, ArtifactRef};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileArtifactAdapter {
    dir: PathBuf,
    fallback_dir: Option<PathBuf>,
    format: ArtifactFormat,
}

impl FileArtifactAdapter {
    pub fn new(dir: impl Into<PathBuf>, format: ArtifactFormat) -> Self {
        Self {
            dir: dir.into(),
            fallback_dir: None,
            format,
        }
    }

    /// Directory tried once more when writing into the primary one fails.
    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback_dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn render(&self, curve: &EquityCurve) -> Result<String, CoachError> {
        match self.format {
            ArtifactFormat::Svg => Ok(render_equity_svg(curve)),
            ArtifactFormat::Json => {
                serde_json::to_string_pretty(curve).map_err(|e| CoachError::ArtifactWrite {
                    path: self.dir.clone(),
                    reason: format!("failed to serialize equity curve: {e}"),
                })
            }
        }
    }
}

/// Write `content` to `path`, creating parent directories.
pub fn write_artifact(path: &Path, content: &str) -> Result<(), CoachError> {
    let to_err = |e: std::io::Error| CoachError::ArtifactWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    fs::write(path, content).map_err(to_err)
}

impl ArtifactPort for FileArtifactAdapter {
    fn format(&self) -> ArtifactFormat {
        self.format
    }

    fn write_equity_curve(&self, curve: &EquityCurve, stem: &str) -> Result<ArtifactRef, CoachError> {
        let name = format!("{stem}.{}", self.format.extension());
        let content = self.render(curve)?;

        let primary = self.dir.join(&name);
        let primary_err = match write_artifact(&primary, &content) {
            Ok(()) => {
                tracing::debug!(path = %primary.display(), points = curve.len(), "equity curve written");
                return Ok(ArtifactRef {
                    name,
                    path: primary,
                });
            }
            Err(e) => e,
        };

        let Some(fallback_dir) = &self.fallback_dir else {
            return Err(primary_err);
        };

        tracing::warn!(error = %primary_err, fallback = %fallback_dir.display(), "retrying artifact write");
        let fallback = fallback_dir.join(&name);
        match write_artifact(&fallback, &content) {
            Ok(()) => Ok(ArtifactRef {
                name,
                path: fallback,
            }),
            Err(fallback_err) => Err(CoachError::ArtifactWrite {
                path: primary,
                reason: format!("{primary_err}; fallback also failed: {fallback_err}"),
            }),
        }
    }
}
