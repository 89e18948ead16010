//! HTTP adapter.
//!
//! JSON API around the backtest pipeline: upload a price CSV, get metrics,
//! bias flags, an equity-curve URL, and suggestions back.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::services::ServeDir;

use crate::domain::bias::BiasThresholds;
use crate::domain::error::CoachError;
use crate::ports::config_port::ConfigPort;
use crate::ports::artifact_port::ArtifactPort;
use crate::ports::run_store_port::RunStore;
use crate::ports::suggestion_port::SuggestionGenerator;

pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

pub struct AppState {
    pub store: Arc<dyn RunStore + Send + Sync>,
    pub artifacts: Arc<dyn ArtifactPort + Send + Sync>,
    pub suggestions: Option<Arc<dyn SuggestionGenerator + Send + Sync>>,
    pub thresholds: BiasThresholds,
    /// Directory served under `/plots`.
    pub plots_dir: PathBuf,
    /// Browser origin allowed to call the API with credentials.
    pub allowed_origin: HeaderValue,
}

/// `[web] allowed_origin`, defaulting to [`DEFAULT_ALLOWED_ORIGIN`].
pub fn allowed_origin_from_config(config: &dyn ConfigPort) -> Result<HeaderValue, CoachError> {
    let origin = config
        .get_trimmed("web", "allowed_origin")
        .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());
    HeaderValue::from_str(&origin).map_err(|_| CoachError::ConfigInvalid {
        section: "web".into(),
        key: "allowed_origin".into(),
        reason: format!("'{origin}' is not a valid header value"),
    })
}

/// Credentialed CORS for one origin; methods and headers mirror the preflight.
pub fn cors_layer(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin([origin])
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

pub fn build_router(state: AppState) -> Router {
    let plots = ServeDir::new(&state.plots_dir);
    let cors = cors_layer(state.allowed_origin.clone());
    Router::new()
        .route("/health", get(handlers::health))
        .route("/backtest", post(handlers::run_backtest))
        .route("/runs", get(handlers::list_runs))
        .route("/runs/{id}", get(handlers::get_run))
        .nest_service("/plots", plots)
        .fallback(handlers::not_found)
        .layer(cors)
        .with_state(Arc::new(state))
}
