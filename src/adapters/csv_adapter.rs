//! CSV file data adapter.
//!
//! Prices come from one file with `Date` and `Close` columns. Each strategy is
//! a `<name>.csv` file in the strategies directory with `Date` and `Amount`
//! columns. Headers are matched case-insensitively and may appear in any order.

use crate::domain::error::DcasimError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::domain::trade::TradeInstruction;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct CsvAdapter {
    prices_path: PathBuf,
    strategies_dir: PathBuf,
}

impl CsvAdapter {
    pub fn new(prices_path: PathBuf, strategies_dir: PathBuf) -> Self {
        Self {
            prices_path,
            strategies_dir,
        }
    }

    fn strategy_path(&self, strategy: &str) -> PathBuf {
        self.strategies_dir.join(format!("{strategy}.csv"))
    }
}

fn data_error(path: &Path, reason: impl std::fmt::Display) -> DcasimError {
    DcasimError::Data {
        reason: format!("{}: {}", path.display(), reason),
    }
}

/// Reads `path` and returns `(date, value)` rows from the named columns.
fn read_dated_column(path: &Path, value_column: &str) -> Result<Vec<(NaiveDate, f64)>, DcasimError> {
    let content =
        fs::read_to_string(path).map_err(|e| data_error(path, format!("failed to read: {e}")))?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| data_error(path, format!("CSV header error: {e}")))?
        .clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| data_error(path, format!("missing {name} column")))
    };
    let date_idx = column("date")?;
    let value_idx = column(value_column)?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        // Line 1 is the header.
        let line = line + 2;
        let record = result.map_err(|e| data_error(path, format!("CSV parse error: {e}")))?;

        let date_str = record.get(date_idx).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
            data_error(path, format!("line {line}: invalid date '{date_str}': {e}"))
        })?;

        let value_str = record.get(value_idx).unwrap_or_default();
        let value: f64 = value_str.parse().map_err(|e| {
            data_error(
                path,
                format!("line {line}: invalid {value_column} value '{value_str}': {e}"),
            )
        })?;

        rows.push((date, value));
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

impl DataPort for CsvAdapter {
    fn fetch_prices(&self) -> Result<PriceSeries, DcasimError> {
        let rows = read_dated_column(&self.prices_path, "close")?;
        let points = rows
            .into_iter()
            .map(|(date, close)| PricePoint { date, close })
            .collect();
        let series = PriceSeries::new(points)?;
        info!(
            "Loaded {} prices from {}",
            series.len(),
            self.prices_path.display()
        );
        Ok(series)
    }

    fn list_strategies(&self) -> Result<Vec<String>, DcasimError> {
        let entries = fs::read_dir(&self.strategies_dir)
            .map_err(|e| data_error(&self.strategies_dir, format!("failed to read directory: {e}")))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| data_error(&self.strategies_dir, format!("directory entry error: {e}")))?
                .path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    fn fetch_trades(&self, strategy: &str) -> Result<Vec<TradeInstruction>, DcasimError> {
        let rows = read_dated_column(&self.strategy_path(strategy), "amount")?;
        Ok(rows
            .into_iter()
            .map(|(date, amount)| TradeInstruction { date, amount })
            .collect())
    }
}
