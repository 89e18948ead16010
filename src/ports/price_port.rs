//! Price data source port.

use crate::domain::error::CoachError;
use crate::domain::returns::PriceSeries;
use std::path::Path;

pub trait PricePort {
    fn load_prices(&self, source: &Path) -> Result<PriceSeries, CoachError>;
}
