//! Port traits implemented by adapters.

pub mod config_port;
pub mod price_port;
pub mod artifact_port;
pub mod run_store_port;
pub mod suggestion_port;
