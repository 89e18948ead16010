//! Price series and derived percentage-change returns.

use super::error::{CoachError, Stage};

/// Time-ordered prices for a single asset, positional index only.
///
/// Guaranteed non-empty and free of NaN/infinite values. Positivity is
/// checked when returns are derived.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Result<Self, CoachError> {
        if prices.is_empty() {
            return Err(CoachError::invalid_input(
                Stage::PriceSeries,
                "price series is empty",
            ));
        }
        if let Some((index, value)) = prices.iter().enumerate().find(|(_, p)| !p.is_finite()) {
            return Err(CoachError::invalid_input(
                Stage::PriceSeries,
                format!("price at index {index} is not a finite number ({value})"),
            ));
        }
        Ok(Self { prices })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn first(&self) -> f64 {
        self.prices[0]
    }

    pub fn last(&self) -> f64 {
        self.prices[self.prices.len() - 1]
    }
}

/// `return[i] = price[i + 1] / price[i] - 1`, one element per consecutive pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    returns: Vec<f64>,
}

impl ReturnSeries {
    /// Derive returns from a price series.
    ///
    /// Any zero or negative price is rejected: a ratio against it is
    /// undefined and must not leak NaN or infinity downstream.
    pub fn derive(prices: &PriceSeries) -> Result<Self, CoachError> {
        let values = prices.as_slice();
        if let Some((index, value)) = values.iter().enumerate().find(|(_, p)| **p <= 0.0) {
            let kind = if *value == 0.0 { "zero" } else { "negative" };
            return Err(CoachError::invalid_input(
                Stage::ReturnDerivation,
                format!("price at index {index} is {kind} ({value}); returns are undefined"),
            ));
        }

        let returns = values.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        Ok(Self { returns })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.returns
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Running product of `1 + r`, shared by drawdown and the equity curve.
    pub fn cumulative_growth(&self) -> Vec<f64> {
        self.returns
            .iter()
            .scan(1.0_f64, |acc, r| {
                *acc *= 1.0 + r;
                Some(*acc)
            })
            .collect()
    }
}
