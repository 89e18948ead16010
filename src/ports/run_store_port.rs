//! Backtest run persistence port.

use crate::domain::error::CoachError;
use crate::domain::metrics::MetricsRecord;
use crate::domain::suggestion::Suggestion;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRun {
    pub id: i64,
    pub upload_id: i64,
    pub filename: String,
    pub metrics: MetricsRecord,
    pub equity_curve_path: Option<String>,
    pub created_at: String,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub id: i64,
    pub filename: String,
    pub metrics: MetricsRecord,
    pub created_at: String,
}

pub trait RunStore {
    /// Register an uploaded price file and return its identifier.
    fn create_upload(&self, filename: &str) -> Result<i64, CoachError>;

    fn record_run(
        &self,
        upload_id: i64,
        metrics: &MetricsRecord,
        equity_curve_path: Option<&str>,
    ) -> Result<i64, CoachError>;

    fn record_suggestions(&self, run_id: i64, suggestions: &[Suggestion]) -> Result<(), CoachError>;

    fn get_run(&self, run_id: i64) -> Result<Option<StoredRun>, CoachError>;

    /// Most recent runs first.
    fn list_runs(&self, limit: usize) -> Result<Vec<RunSummary>, CoachError>;
}
