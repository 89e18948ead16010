//! Division guard shared by every ratio the engine computes.

/// `numerator / denominator`, or `0.0` when the denominator is exactly zero.
///
/// Used for the Sharpe ratio (zero volatility) and drawdown ratios so that a
/// degenerate series yields a policy value instead of NaN or infinity.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Bessel-corrected (n - 1) sample standard deviation; `0.0` for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1.0)).sqrt()
}
