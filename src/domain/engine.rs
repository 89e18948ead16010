//! Backtest metrics engine: prices in, metrics/flags/curve out.
//!
//! Pure computation. Storage, rendering, and suggestion generation happen in
//! [`super::backtest`] through ports.

use super::bias::{BiasFlags, BiasThresholds};
use super::equity::EquityCurve;
use super::error::CoachError;
use super::metrics::MetricsRecord;
use super::returns::{PriceSeries, ReturnSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub returns: ReturnSeries,
    pub metrics: MetricsRecord,
    pub flags: BiasFlags,
    pub equity_curve: EquityCurve,
}

/// Run return derivation once and feed both the metrics/flags branch and
/// the equity-curve branch. Fails before producing any metrics if the
/// prices cannot yield returns.
pub fn analyze(prices: &PriceSeries, thresholds: &BiasThresholds) -> Result<EngineOutput, CoachError> {
    let returns = ReturnSeries::derive(prices)?;

    let metrics = MetricsRecord::compute(prices, &returns);
    let flags = thresholds.evaluate(&metrics);
    let equity_curve = EquityCurve::from_returns(&returns);

    Ok(EngineOutput {
        returns,
        metrics,
        flags,
        equity_curve,
    })
}

/// Convenience wrapper over raw values with default thresholds.
pub fn analyze_prices(values: &[f64]) -> Result<EngineOutput, CoachError> {
    let prices = PriceSeries::new(values.to_vec())?;
    analyze(&prices, &BiasThresholds::default())
}
