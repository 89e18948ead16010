//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_artifact_adapter::FileArtifactAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as pipeline, ArtifactStatus, BacktestOutcome, Collaborators};
use crate::domain::bias::{
    BiasThresholds, MAX_PLAUSIBLE_SHARPE, MIN_PLAUSIBLE_DRAWDOWN, MIN_SAMPLE_PRICE_POINTS,
};
use crate::domain::config_validation::validate_config;
use crate::domain::error::CoachError;
use crate::ports::artifact_port::{ArtifactFormat, ArtifactPort};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::run_store_port::RunStore;
use crate::ports::suggestion_port::SuggestionGenerator;

pub const DEFAULT_ARTIFACT_DIR: &str = "plots";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(
    name = "backtest-coach",
    about = "Backtest metrics, bias flags and equity curves from a price series"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a CSV price series
    Analyze {
        /// CSV file with a `price` column
        #[arg(short, long)]
        prices: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for the equity-curve artifact (overrides [artifact] dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Artifact format: svg or json (overrides [artifact] format)
        #[arg(long)]
        format: Option<String>,
        /// Do not record the run even if [sqlite] is configured
        #[arg(long)]
        no_store: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recorded runs
    Runs {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a recorded run
    Show {
        id: i64,
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Start the web server
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    let result = match cli.command {
        Command::Analyze {
            prices,
            config,
            output_dir,
            format,
            no_store,
            json,
        } => run_analyze(
            &prices,
            config.as_deref(),
            output_dir.as_deref(),
            format.as_deref(),
            no_store,
            json,
        ),
        Command::Runs { config, limit } => run_list_runs(&config, limit),
        Command::Show { id, config } => run_show(id, &config),
        Command::Validate { config } => run_validate(&config),
        Command::Serve { config } => run_serve(&config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, CoachError> {
    FileConfigAdapter::from_file(path).map_err(|e| CoachError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_validated_config(path: Option<&Path>) -> Result<FileConfigAdapter, CoachError> {
    let adapter = match path {
        Some(p) => {
            tracing::info!("loading config from {}", p.display());
            load_config(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_config(&adapter)?;
    Ok(adapter)
}

pub fn build_bias_thresholds(config: &dyn ConfigPort) -> BiasThresholds {
    BiasThresholds {
        min_sample_price_points: config
            .get_int("bias", "min_sample_points", MIN_SAMPLE_PRICE_POINTS as i64)
            .max(0) as usize,
        max_sharpe: config.get_double("bias", "max_sharpe", MAX_PLAUSIBLE_SHARPE),
        min_drawdown: config.get_double("bias", "min_drawdown", MIN_PLAUSIBLE_DRAWDOWN),
    }
}

pub fn build_artifact_adapter(
    config: &dyn ConfigPort,
    dir_override: Option<&Path>,
    format_override: Option<&str>,
) -> Result<FileArtifactAdapter, CoachError> {
    let raw_format = format_override
        .map(str::to_string)
        .or_else(|| config.get_trimmed("artifact", "format"));
    let format = match raw_format {
        Some(raw) => raw
            .parse::<ArtifactFormat>()
            .map_err(|reason| CoachError::ConfigInvalid {
                section: "artifact".into(),
                key: "format".into(),
                reason,
            })?,
        None => ArtifactFormat::default(),
    };

    let dir = match dir_override {
        Some(d) => d.to_path_buf(),
        None => PathBuf::from(
            config
                .get_trimmed("artifact", "dir")
                .unwrap_or_else(|| DEFAULT_ARTIFACT_DIR.to_string()),
        ),
    };

    let adapter = FileArtifactAdapter::new(dir, format);
    Ok(match config.get_trimmed("artifact", "fallback_dir") {
        Some(fallback) => adapter.with_fallback(fallback),
        None => adapter,
    })
}

/// `None` when `[suggestions] enabled` is off.
pub fn build_suggestion_generator(
    config: &dyn ConfigPort,
) -> Result<Option<Box<dyn SuggestionGenerator + Send + Sync>>, CoachError> {
    if !config.get_bool("suggestions", "enabled", false) {
        return Ok(None);
    }

    #[cfg(feature = "llm")]
    {
        use crate::adapters::openai_adapter::OpenAiSuggestionAdapter;
        let generator: Box<dyn SuggestionGenerator + Send + Sync> =
            Box::new(OpenAiSuggestionAdapter::from_config(config)?);
        Ok(Some(generator))
    }

    #[cfg(not(feature = "llm"))]
    {
        tracing::warn!("suggestions are enabled but the llm feature is not compiled in");
        Ok(None)
    }
}

/// Open the run store if `[sqlite] path` is configured.
pub fn build_run_store(
    config: &dyn ConfigPort,
) -> Result<Option<Box<dyn RunStore + Send + Sync>>, CoachError> {
    if config.get_trimmed("sqlite", "path").is_none() {
        return Ok(None);
    }

    #[cfg(feature = "sqlite")]
    {
        use crate::adapters::sqlite_adapter::SqliteRunStore;
        let store: Box<dyn RunStore + Send + Sync> = Box::new(SqliteRunStore::from_config(config)?);
        Ok(Some(store))
    }

    #[cfg(not(feature = "sqlite"))]
    {
        tracing::warn!("[sqlite] is configured but the sqlite feature is not compiled in");
        Ok(None)
    }
}

fn require_run_store(config: &dyn ConfigPort) -> Result<Box<dyn RunStore + Send + Sync>, CoachError> {
    build_run_store(config)?.ok_or_else(|| CoachError::ConfigMissing {
        section: "sqlite".into(),
        key: "path".into(),
    })
}

pub fn run_analyze(
    prices_path: &Path,
    config_path: Option<&Path>,
    output_dir: Option<&Path>,
    format: Option<&str>,
    no_store: bool,
    json: bool,
) -> Result<ExitCode, CoachError> {
    let config = load_validated_config(config_path)?;
    let thresholds = build_bias_thresholds(&config);
    let artifacts = build_artifact_adapter(&config, output_dir, format)?;
    let store = if no_store {
        None
    } else {
        build_run_store(&config)?
    };
    let generator = build_suggestion_generator(&config)?;

    tracing::info!("loading prices from {}", prices_path.display());
    let prices = CsvPriceAdapter::new().load_prices(prices_path)?;
    tracing::info!(points = prices.len(), "running backtest");

    let label = prices_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| prices_path.display().to_string());

    let collaborators = Collaborators {
        artifacts: &artifacts,
        store: store.as_deref().map(|s| s as &dyn RunStore),
        suggestions: generator.as_deref().map(|g| g as &dyn SuggestionGenerator),
    };
    let outcome = pipeline::run_backtest(&label, &prices, &thresholds, &collaborators)?;

    for warning in outcome.warnings() {
        tracing::warn!("{warning}");
    }
    if let ArtifactStatus::Written(r) = &outcome.artifact {
        tracing::info!("equity curve written to {}", r.path.display());
    }

    if json {
        println!("{}", outcome_json(&outcome));
    } else {
        print!("{}", format_report(&outcome));
    }
    Ok(ExitCode::SUCCESS)
}

pub fn outcome_json(outcome: &BacktestOutcome) -> serde_json::Value {
    serde_json::json!({
        "run_id": outcome.run_id,
        "label": outcome.label,
        "metrics": outcome.metrics,
        "flags": outcome.flags,
        "artifact": outcome.artifact.artifact().map(|r| r.path.display().to_string()),
        "suggestions": outcome.suggestions.suggestions(),
        "warnings": outcome.warnings(),
    })
}

pub fn format_report(outcome: &BacktestOutcome) -> String {
    let m = &outcome.metrics;
    let mut out = String::new();

    let _ = writeln!(out, "=== Backtest: {} ===", outcome.label);
    if let Some(id) = outcome.run_id {
        let _ = writeln!(out, "Run ID:        {id}");
    }
    let _ = writeln!(out, "Total Return:  {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Volatility:    {:.4}", m.volatility);
    let _ = writeln!(out, "Sharpe:        {:.2}", m.sharpe);
    let _ = writeln!(out, "Max Drawdown:  {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Points:        {}", m.n_points);

    let _ = writeln!(out, "\n=== Bias Flags ===");
    if outcome.flags.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for flag in &outcome.flags {
        let _ = writeln!(out, "  - {flag}");
    }

    match &outcome.artifact {
        ArtifactStatus::Written(r) => {
            let _ = writeln!(out, "\nEquity curve: {}", r.path.display());
        }
        ArtifactStatus::Unavailable { reason } => {
            let _ = writeln!(out, "\nEquity curve unavailable: {reason}");
        }
    }

    let suggestions = outcome.suggestions.suggestions();
    if !suggestions.is_empty() {
        let _ = writeln!(out, "\n=== Suggestions ===");
        for (i, s) in suggestions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, s.title);
            if !s.description.is_empty() {
                let _ = writeln!(out, "   {}", s.description);
            }
            if let Some(note) = &s.risk_note {
                let _ = writeln!(out, "   Risk: {note}");
            }
        }
    }
    out
}

fn run_list_runs(config_path: &Path, limit: usize) -> Result<ExitCode, CoachError> {
    let config = load_validated_config(Some(config_path))?;
    let store = require_run_store(&config)?;

    let runs = store.list_runs(limit)?;
    if runs.is_empty() {
        tracing::info!("no runs recorded");
    }
    for run in &runs {
        println!(
            "{:>5}  {}  {:<24}  return {:>8.2}%  sharpe {:>6.2}  points {}",
            run.id,
            run.created_at,
            run.filename,
            run.metrics.total_return * 100.0,
            run.metrics.sharpe,
            run.metrics.n_points,
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_show(id: i64, config_path: &Path) -> Result<ExitCode, CoachError> {
    let config = load_validated_config(Some(config_path))?;
    let store = require_run_store(&config)?;

    match store.get_run(id)? {
        Some(run) => {
            let rendered = serde_json::to_string_pretty(&run).map_err(|e| {
                CoachError::Io(std::io::Error::other(e.to_string()))
            })?;
            println!("{rendered}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            tracing::error!("run {id} not found");
            Ok(ExitCode::from(1))
        }
    }
}

fn run_validate(config_path: &Path) -> Result<ExitCode, CoachError> {
    let config = load_validated_config(Some(config_path))?;
    let thresholds = build_bias_thresholds(&config);
    let artifacts = build_artifact_adapter(&config, None, None)?;

    eprintln!("Bias thresholds:");
    eprintln!("  min_sample_points: {}", thresholds.min_sample_price_points);
    eprintln!("  max_sharpe:        {}", thresholds.max_sharpe);
    eprintln!("  min_drawdown:      {}", thresholds.min_drawdown);
    eprintln!("Artifacts: {} ({})", artifacts.dir().display(), artifacts.format());
    eprintln!(
        "Suggestions: {}",
        if config.get_bool("suggestions", "enabled", false) {
            "enabled"
        } else {
            "disabled"
        }
    );
    eprintln!("\nConfiguration is valid.");
    Ok(ExitCode::SUCCESS)
}

fn run_serve(config_path: &Path) -> Result<ExitCode, CoachError> {
    #[cfg(feature = "web")]
    {
        use crate::adapters::sqlite_adapter::SqliteRunStore;
        use crate::adapters::web::{allowed_origin_from_config, build_router, AppState};
        use std::net::SocketAddr;
        use std::sync::Arc;

        let config = load_validated_config(Some(config_path))?;
        let artifacts = build_artifact_adapter(&config, None, None)?;
        let plots_dir = artifacts.dir().to_path_buf();
        std::fs::create_dir_all(&plots_dir)?;

        let store = SqliteRunStore::from_config(&config)?;
        let suggestions = build_suggestion_generator(&config)?
            .map(Arc::<dyn SuggestionGenerator + Send + Sync>::from);

        let listen = config
            .get_trimmed("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let addr: SocketAddr = listen.parse().map_err(|_| CoachError::ConfigInvalid {
            section: "web".into(),
            key: "listen".into(),
            reason: format!("'{listen}' is not a socket address"),
        })?;

        // the blocking HTTP client must be dropped outside the runtime
        let _generator = suggestions.clone();

        let state = AppState {
            store: Arc::new(store),
            artifacts: Arc::new(artifacts),
            suggestions,
            thresholds: build_bias_thresholds(&config),
            plots_dir,
            allowed_origin: allowed_origin_from_config(&config)?,
        };
        let router = build_router(state);

        tracing::info!("starting web server on {addr}");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, router).await
        })?;

        Ok(ExitCode::SUCCESS)
    }

    #[cfg(not(feature = "web"))]
    {
        let _ = config_path;
        tracing::error!("web feature is required for serve");
        Ok(ExitCode::from(1))
    }
}
