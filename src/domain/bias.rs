//! Heuristic bias flags derived from metrics.

use super::metrics::MetricsRecord;

/// Fewer price observations than this (counted on the price series, not the
/// return series) raises the sample-size flag.
pub const MIN_SAMPLE_PRICE_POINTS: usize = 50;
/// A Sharpe ratio above this raises the overfitting flag.
pub const MAX_PLAUSIBLE_SHARPE: f64 = 3.0;
/// A max drawdown shallower than this raises the low-drawdown flag.
pub const MIN_PLAUSIBLE_DRAWDOWN: f64 = -0.02;

pub const SMALL_SAMPLE_FLAG: &str = "Sample size is small; results may be unreliable.";
pub const HIGH_SHARPE_FLAG: &str = "Sharpe ratio is very high; potential overfitting.";
pub const LOW_DRAWDOWN_FLAG: &str =
    "Very low drawdown; may indicate unrealistic data or overfitting.";

pub type BiasFlags = Vec<String>;

#[derive(Debug, Clone, PartialEq)]
pub struct BiasThresholds {
    pub min_sample_price_points: usize,
    pub max_sharpe: f64,
    pub min_drawdown: f64,
}

impl Default for BiasThresholds {
    fn default() -> Self {
        Self {
            min_sample_price_points: MIN_SAMPLE_PRICE_POINTS,
            max_sharpe: MAX_PLAUSIBLE_SHARPE,
            min_drawdown: MIN_PLAUSIBLE_DRAWDOWN,
        }
    }
}

impl BiasThresholds {
    /// Evaluate rules in order: sample size, Sharpe, drawdown.
    pub fn evaluate(&self, metrics: &MetricsRecord) -> BiasFlags {
        let mut flags = BiasFlags::new();
        if metrics.n_points < self.min_sample_price_points {
            flags.push(SMALL_SAMPLE_FLAG.to_string());
        }
        if metrics.sharpe > self.max_sharpe {
            flags.push(HIGH_SHARPE_FLAG.to_string());
        }
        if metrics.max_drawdown > self.min_drawdown {
            flags.push(LOW_DRAWDOWN_FLAG.to_string());
        }
        flags
    }
}

/// Evaluate with the default thresholds.
pub fn evaluate_bias_flags(metrics: &MetricsRecord) -> BiasFlags {
    BiasThresholds::default().evaluate(metrics)
}
