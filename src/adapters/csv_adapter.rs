//! CSV price file adapter.
//!
//! Expects a header row with a `price` column; other columns are ignored.

use crate::domain::error::CoachError;
use crate::domain::returns::PriceSeries;
use crate::ports::price_port::PricePort;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const PRICE_COLUMN: &str = "price";

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvPriceAdapter;

impl CsvPriceAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Only `.csv` file names are accepted (case-insensitive).
pub fn check_csv_name(name: &str) -> Result<(), CoachError> {
    if name.to_lowercase().ends_with(".csv") {
        Ok(())
    } else {
        Err(CoachError::PriceData {
            source_name: name.to_string(),
            reason: "only CSV files are supported".into(),
        })
    }
}

/// Parse the `price` column of CSV content into raw values.
pub fn parse_prices<R: Read>(reader: R, source_name: &str) -> Result<Vec<f64>, CoachError> {
    let data_err = |reason: String| CoachError::PriceData {
        source_name: source_name.to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::Fields).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| data_err(format!("CSV parse error: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h == PRICE_COLUMN)
        .ok_or_else(|| data_err(format!("CSV must have a '{PRICE_COLUMN}' column")))?;

    let mut prices = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        // header is row 1
        let row = i + 2;
        let record = result.map_err(|e| data_err(format!("CSV parse error at row {row}: {e}")))?;
        let raw = record
            .get(column)
            .ok_or_else(|| data_err(format!("missing price value at row {row}")))?;
        let value: f64 = raw
            .parse()
            .map_err(|e| data_err(format!("invalid price '{raw}' at row {row}: {e}")))?;
        prices.push(value);
    }

    Ok(prices)
}

impl PricePort for CsvPriceAdapter {
    fn load_prices(&self, source: &Path) -> Result<PriceSeries, CoachError> {
        let name = source.display().to_string();
        check_csv_name(&name)?;

        let file = File::open(source).map_err(|e| CoachError::PriceData {
            source_name: name.clone(),
            reason: format!("failed to read {name}: {e}"),
        })?;

        PriceSeries::new(parse_prices(file, &name)?)
    }
}
