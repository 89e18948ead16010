//! Return-based performance metrics.

use super::returns::{PriceSeries, ReturnSeries};
use super::safe_math::{safe_divide, sample_std_dev};
use serde::{Deserialize, Serialize};

/// Flat metrics record for one backtest invocation.
///
/// The Sharpe ratio here is total return over return volatility: not
/// annualized and without a risk-free rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub total_return: f64,
    pub volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub n_points: usize,
}

impl MetricsRecord {
    pub fn compute(prices: &PriceSeries, returns: &ReturnSeries) -> Self {
        let total_return = safe_divide(prices.last(), prices.first()) - 1.0;
        let volatility = sample_std_dev(returns.as_slice());
        let sharpe = safe_divide(total_return, volatility);
        let max_drawdown = compute_max_drawdown(&returns.cumulative_growth());

        MetricsRecord {
            total_return,
            volatility,
            sharpe,
            max_drawdown,
            n_points: prices.len(),
        }
    }
}

/// Most negative `equity / running_peak - 1`; `0.0` for an empty curve.
fn compute_max_drawdown(cumulative: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &equity in cumulative {
        if equity > peak {
            peak = equity;
        }
        let dd = safe_divide(equity, peak) - 1.0;
        if dd < max_dd {
            max_dd = dd;
        }
    }

    max_dd
}
