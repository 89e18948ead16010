//! Normalized equity curve built from returns.

use super::returns::ReturnSeries;
use serde::{Deserialize, Serialize};

/// One point of the curve. `index` is the position of the closing
/// observation in the price series, so the first point sits at 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub index: usize,
    pub equity: f64,
}

/// Cumulative product of `1 + return`. Not anchored at 1.0: the first
/// point is `1 + return[0]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn from_returns(returns: &ReturnSeries) -> Self {
        let points = returns
            .cumulative_growth()
            .into_iter()
            .enumerate()
            .map(|(i, equity)| EquityPoint {
                index: i + 1,
                equity,
            })
            .collect();
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// (min, max) equity, or `None` for an empty curve.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        if self.points.is_empty() {
            return None;
        }
        let min = self
            .points
            .iter()
            .map(|p| p.equity)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .points
            .iter()
            .map(|p| p.equity)
            .fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}
