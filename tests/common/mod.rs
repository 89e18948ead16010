#![allow(dead_code)]

use backtest_coach::domain::equity::EquityCurve;
use backtest_coach::domain::error::CoachError;
use backtest_coach::domain::metrics::MetricsRecord;
use backtest_coach::domain::returns::PriceSeries;
use backtest_coach::domain::suggestion::Suggestion;
use backtest_coach::ports::artifact_port::{ArtifactFormat, ArtifactPort, ArtifactRef};
use backtest_coach::ports::run_store_port::{RunStore, RunSummary, StoredRun};
use backtest_coach::ports::suggestion_port::SuggestionGenerator;
use std::path::PathBuf;
use std::sync::Mutex;

pub const REFERENCE_PRICES: [f64; 5] = [100.0, 102.0, 101.0, 105.0, 103.0];

pub fn series(values: &[f64]) -> PriceSeries {
    PriceSeries::new(values.to_vec()).unwrap()
}

/// `n` prices growing by a constant ratio `1 + r`.
pub fn geometric_prices(start: f64, r: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start * (1.0 + r).powi(i as i32)).collect()
}

#[derive(Default)]
struct MemoryInner {
    uploads: Vec<String>,
    runs: Vec<StoredRun>,
}

/// In-memory run store with optional injected failure.
#[derive(Default)]
pub struct MemoryRunStore {
    inner: Mutex<MemoryInner>,
    pub fail_record_run: bool,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_record_run: true,
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.inner.lock().unwrap().uploads.len()
    }

    pub fn run_count(&self) -> usize {
        self.inner.lock().unwrap().runs.len()
    }
}

impl RunStore for MemoryRunStore {
    fn create_upload(&self, filename: &str) -> Result<i64, CoachError> {
        let mut inner = self.inner.lock().unwrap();
        inner.uploads.push(filename.to_string());
        Ok(inner.uploads.len() as i64)
    }

    fn record_run(
        &self,
        upload_id: i64,
        metrics: &MetricsRecord,
        equity_curve_path: Option<&str>,
    ) -> Result<i64, CoachError> {
        if self.fail_record_run {
            return Err(CoachError::DatabaseQuery {
                reason: "disk full".into(),
            });
        }
        let mut inner = self.inner.lock().unwrap();
        let filename = inner.uploads[(upload_id - 1) as usize].clone();
        let id = inner.runs.len() as i64 + 1;
        inner.runs.push(StoredRun {
            id,
            upload_id,
            filename,
            metrics: metrics.clone(),
            equity_curve_path: equity_curve_path.map(str::to_string),
            created_at: "2026-01-01T00:00:00+00:00".into(),
            suggestions: Vec::new(),
        });
        Ok(id)
    }

    fn record_suggestions(&self, run_id: i64, suggestions: &[Suggestion]) -> Result<(), CoachError> {
        let mut inner = self.inner.lock().unwrap();
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| CoachError::DatabaseQuery {
                reason: format!("no run {run_id}"),
            })?;
        run.suggestions.extend_from_slice(suggestions);
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> Result<Option<StoredRun>, CoachError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.runs.iter().find(|r| r.id == run_id).cloned())
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, CoachError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .runs
            .iter()
            .rev()
            .take(limit)
            .map(|r| RunSummary {
                id: r.id,
                filename: r.filename.clone(),
                metrics: r.metrics.clone(),
                created_at: r.created_at.clone(),
            })
            .collect())
    }
}

/// Generator returning a fixed reply and recording the prompts it saw.
pub struct ScriptedGenerator {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl SuggestionGenerator for ScriptedGenerator {
    fn complete(&self, prompt: &str) -> Result<String, CoachError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(|reason| CoachError::UpstreamGeneration { reason })
    }
}

/// Artifact port that remembers stems instead of touching the filesystem.
#[derive(Default)]
pub struct RecordingArtifacts {
    pub fail: bool,
    pub written: Mutex<Vec<(String, EquityCurve)>>,
}

impl RecordingArtifacts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn stems(&self) -> Vec<String> {
        self.written.lock().unwrap().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl ArtifactPort for RecordingArtifacts {
    fn format(&self) -> ArtifactFormat {
        ArtifactFormat::Svg
    }

    fn write_equity_curve(&self, curve: &EquityCurve, stem: &str) -> Result<ArtifactRef, CoachError> {
        let path = PathBuf::from("plots").join(format!("{stem}.svg"));
        if self.fail {
            return Err(CoachError::ArtifactWrite {
                path,
                reason: "read-only file system".into(),
            });
        }
        self.written
            .lock()
            .unwrap()
            .push((stem.to_string(), curve.clone()));
        Ok(ArtifactRef {
            name: format!("{stem}.svg"),
            path,
        })
    }
}

pub const THREE_SUGGESTIONS: &str = r#"[
  {"title": "Walk-forward split", "description": "Hold out the last 30% of prices", "risk_note": "Small sample"},
  {"title": "Transaction costs", "description": "Add 10bp per trade", "risk_note": "Optimistic fills"},
  {"title": "Longer history", "description": "Extend to 5 years", "risk_note": null},
  {"title": "Extra", "description": "should be dropped", "risk_note": null}
]"#;
