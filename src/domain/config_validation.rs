//! Configuration validation.
//!
//! Validates all config fields before a backtest runs. Every key is
//! optional; only values that are present are checked.

use crate::domain::error::CoachError;
use crate::ports::artifact_port::ArtifactFormat;
use crate::ports::config_port::ConfigPort;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), CoachError> {
    validate_bias_thresholds(config)?;
    validate_artifact(config)?;
    validate_sqlite(config)?;
    validate_suggestions(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> CoachError {
    CoachError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, CoachError> {
    match config.get_trimmed(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a finite number"))),
    }
}

fn validate_bias_thresholds(config: &dyn ConfigPort) -> Result<(), CoachError> {
    if let Some(raw) = config.get_trimmed("bias", "min_sample_points") {
        match raw.parse::<i64>() {
            Ok(v) if v > 0 => {}
            _ => {
                return Err(invalid(
                    "bias",
                    "min_sample_points",
                    "min_sample_points must be a positive integer",
                ));
            }
        }
    }

    parse_number(config, "bias", "max_sharpe")?;

    if let Some(v) = parse_number(config, "bias", "min_drawdown")? {
        if v > 0.0 {
            return Err(invalid(
                "bias",
                "min_drawdown",
                "min_drawdown must be zero or negative",
            ));
        }
    }
    Ok(())
}

fn validate_artifact(config: &dyn ConfigPort) -> Result<(), CoachError> {
    if let Some(raw) = config.get_trimmed("artifact", "format") {
        raw.parse::<ArtifactFormat>()
            .map_err(|reason| invalid("artifact", "format", reason))?;
    }
    Ok(())
}

fn validate_sqlite(config: &dyn ConfigPort) -> Result<(), CoachError> {
    if let Some(raw) = config.get_trimmed("sqlite", "pool_size") {
        match raw.parse::<i64>() {
            Ok(v) if v > 0 => {}
            _ => {
                return Err(invalid(
                    "sqlite",
                    "pool_size",
                    "pool_size must be a positive integer",
                ));
            }
        }
    }
    Ok(())
}

fn validate_suggestions(config: &dyn ConfigPort) -> Result<(), CoachError> {
    if let Some(t) = parse_number(config, "suggestions", "temperature")? {
        if !(0.0..=2.0).contains(&t) {
            return Err(invalid(
                "suggestions",
                "temperature",
                "temperature must be between 0 and 2",
            ));
        }
    }
    Ok(())
}
