//! Backtest pipeline: engine plus its collaborators.
//!
//! Order of work: engine → register upload → write equity artifact → record
//! run → generate suggestions → record suggestions. Only input errors and
//! store errors abort the pipeline; artifact and suggestion failures are
//! reported in the outcome.

use super::bias::{BiasFlags, BiasThresholds};
use super::engine;
use super::equity::EquityCurve;
use super::error::CoachError;
use super::metrics::MetricsRecord;
use super::returns::PriceSeries;
use super::suggestion::{build_prompt, parse_suggestions, SuggestionStatus};
use crate::ports::artifact_port::{ArtifactPort, ArtifactRef};
use crate::ports::run_store_port::RunStore;
use crate::ports::suggestion_port::SuggestionGenerator;

pub struct Collaborators<'a> {
    pub artifacts: &'a dyn ArtifactPort,
    pub store: Option<&'a dyn RunStore>,
    pub suggestions: Option<&'a dyn SuggestionGenerator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactStatus {
    Written(ArtifactRef),
    Unavailable { reason: String },
}

impl ArtifactStatus {
    pub fn artifact(&self) -> Option<&ArtifactRef> {
        match self {
            ArtifactStatus::Written(r) => Some(r),
            ArtifactStatus::Unavailable { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    /// Store-assigned run id; `None` when no store is attached.
    pub run_id: Option<i64>,
    pub label: String,
    pub metrics: MetricsRecord,
    pub flags: BiasFlags,
    pub equity_curve: EquityCurve,
    pub artifact: ArtifactStatus,
    pub suggestions: SuggestionStatus,
}

impl BacktestOutcome {
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if let ArtifactStatus::Unavailable { reason } = &self.artifact {
            warnings.push(format!("equity curve unavailable: {reason}"));
        }
        if let Some(w) = self.suggestions.warning() {
            warnings.push(w);
        }
        warnings
    }
}

pub fn run_backtest(
    label: &str,
    prices: &PriceSeries,
    thresholds: &BiasThresholds,
    collaborators: &Collaborators<'_>,
) -> Result<BacktestOutcome, CoachError> {
    let output = engine::analyze(prices, thresholds)?;

    let upload_id = match collaborators.store {
        Some(store) => Some(store.create_upload(label)?),
        None => None,
    };

    let stem = match upload_id {
        Some(id) => format!("equity_{id}"),
        None => format!("equity_{}", artifact_stem(label)),
    };

    let artifact = match collaborators
        .artifacts
        .write_equity_curve(&output.equity_curve, &stem)
    {
        Ok(r) => ArtifactStatus::Written(r),
        Err(e) => ArtifactStatus::Unavailable {
            reason: e.to_string(),
        },
    };

    let run_id = match (collaborators.store, upload_id) {
        (Some(store), Some(upload_id)) => {
            let path = artifact
                .artifact()
                .map(|r| r.path.to_string_lossy().into_owned());
            Some(store.record_run(upload_id, &output.metrics, path.as_deref())?)
        }
        _ => None,
    };

    let suggestions = match collaborators.suggestions {
        Some(generator) => {
            match generator.complete(&build_prompt(&output.metrics, &output.flags)) {
                Ok(raw) => parse_suggestions(&raw),
                Err(e) => SuggestionStatus::Unavailable {
                    reason: e.to_string(),
                },
            }
        }
        None => SuggestionStatus::Disabled,
    };

    if let (Some(store), Some(run_id)) = (collaborators.store, run_id) {
        let items = suggestions.suggestions();
        if !items.is_empty() {
            store.record_suggestions(run_id, items)?;
        }
    }

    Ok(BacktestOutcome {
        run_id,
        label: label.to_string(),
        metrics: output.metrics,
        flags: output.flags,
        equity_curve: output.equity_curve,
        artifact,
        suggestions,
    })
}

/// File-name-safe stem derived from a caller label such as `prices.csv`.
pub fn artifact_stem(label: &str) -> String {
    let base = label.rsplit(['/', '\\']).next().unwrap_or(label);
    let base = base.strip_suffix(".csv").unwrap_or(base);
    let stem: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "run".to_string()
    } else {
        stem
    }
}
