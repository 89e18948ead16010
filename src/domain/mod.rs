//! Core domain types and logic.

pub mod error;
pub mod safe_math;
pub mod returns;
pub mod metrics;
pub mod bias;
pub mod equity;
pub mod engine;
pub mod suggestion;
pub mod backtest;
pub mod config_validation;
