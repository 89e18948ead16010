//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::adapters::csv_adapter::{check_csv_name, parse_prices};
use crate::domain::backtest::{run_backtest as run_backtest_pipeline, Collaborators};
use crate::domain::metrics::MetricsRecord;
use crate::domain::returns::PriceSeries;
use crate::domain::suggestion::Suggestion;
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::run_store_port::{RunStore, RunSummary, StoredRun};
use crate::ports::suggestion_port::SuggestionGenerator;

use super::{AppState, WebError};

const UPLOAD_FIELD: &str = "file";
const DEFAULT_RUN_LIMIT: usize = 20;

#[derive(Debug, Serialize, Deserialize)]
pub struct BacktestResponse {
    pub run_id: Option<i64>,
    pub metrics: MetricsRecord,
    pub flags: Vec<String>,
    pub plot_url: Option<String>,
    pub suggestions: Vec<Suggestion>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn run_backtest(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<BacktestResponse>, WebError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| WebError::bad_request(format!("failed to read upload: {e}")))?;
        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) =
        upload.ok_or_else(|| WebError::bad_request("missing 'file' field in upload"))?;
    check_csv_name(&filename)?;
    let prices = PriceSeries::new(parse_prices(bytes.as_slice(), &filename)?)?;

    tracing::info!(file = %filename, points = prices.len(), "running backtest");

    let worker_state = Arc::clone(&state);
    let outcome = tokio::task::spawn_blocking(move || {
        let state = worker_state;
        let collaborators = Collaborators {
            artifacts: &*state.artifacts as &dyn ArtifactPort,
            store: Some(&*state.store as &dyn RunStore),
            suggestions: state
                .suggestions
                .as_deref()
                .map(|g| g as &dyn SuggestionGenerator),
        };
        run_backtest_pipeline(&filename, &prices, &state.thresholds, &collaborators)
    })
    .await
    .map_err(|e| WebError::internal(format!("backtest worker failed: {e}")))??;

    for warning in outcome.warnings() {
        tracing::warn!(run_id = ?outcome.run_id, "{warning}");
    }

    let plot_url = outcome
        .artifact
        .artifact()
        .filter(|r| r.path.starts_with(&state.plots_dir))
        .map(|r| format!("/plots/{}", r.name));

    Ok(Json(BacktestResponse {
        run_id: outcome.run_id,
        warnings: outcome.warnings(),
        suggestions: outcome.suggestions.suggestions().to_vec(),
        metrics: outcome.metrics,
        flags: outcome.flags,
        plot_url,
    }))
}

pub async fn get_run(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<StoredRun>, WebError> {
    state
        .store
        .get_run(id)?
        .map(Json)
        .ok_or_else(|| WebError::not_found(format!("run {id} not found")))
}

pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<RunSummary>>, WebError> {
    let limit = params.limit.unwrap_or(DEFAULT_RUN_LIMIT);
    Ok(Json(state.store.list_runs(limit)?))
}

pub async fn not_found() -> Response {
    WebError::not_found("not found").into_response()
}
