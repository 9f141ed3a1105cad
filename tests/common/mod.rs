#![allow(dead_code)]

use chrono::NaiveDate;
use dcasim::domain::error::DcasimError;
use dcasim::domain::price::{PricePoint, PriceSeries};
use dcasim::domain::report::SimulationReport;
use dcasim::domain::simulation::SimulationConfig;
use dcasim::domain::trade::TradeInstruction;
use dcasim::ports::data_port::DataPort;
use dcasim::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn parse_date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn prices(rows: &[(&str, f64)]) -> PriceSeries {
    PriceSeries::new(
        rows.iter()
            .map(|&(d, close)| PricePoint {
                date: parse_date(d),
                close,
            })
            .collect(),
    )
    .unwrap()
}

pub fn trade(d: &str, amount: f64) -> TradeInstruction {
    TradeInstruction {
        date: parse_date(d),
        amount,
    }
}

pub fn config(initial_amount: f64, monthly_contribution: f64) -> SimulationConfig {
    SimulationConfig {
        initial_amount,
        monthly_contribution,
        annual_risk_free_rate: 0.02,
    }
}

/// Every weekday between `start` and `end` inclusive, with a constant price
/// drift of `step` per day.
pub fn weekday_prices(start: NaiveDate, end: NaiveDate, first: f64, step: f64) -> PriceSeries {
    use chrono::Datelike;
    let mut points = Vec::new();
    let mut close = first;
    for d in start.iter_days().take_while(|d| *d <= end) {
        if d.weekday().number_from_monday() <= 5 {
            points.push(PricePoint { date: d, close });
            close += step;
        }
    }
    PriceSeries::new(points).unwrap()
}

pub struct MockDataPort {
    pub prices: Vec<PricePoint>,
    pub strategies: BTreeMap<String, Vec<TradeInstruction>>,
    pub errors: BTreeMap<String, String>,
}

impl MockDataPort {
    pub fn new(series: &PriceSeries) -> Self {
        Self {
            prices: series.points().to_vec(),
            strategies: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_strategy(mut self, name: &str, trades: Vec<TradeInstruction>) -> Self {
        self.strategies.insert(name.to_string(), trades);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_prices(&self) -> Result<PriceSeries, DcasimError> {
        PriceSeries::new(self.prices.clone())
    }

    fn list_strategies(&self) -> Result<Vec<String>, DcasimError> {
        let mut names: Vec<String> = self
            .strategies
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn fetch_trades(&self, strategy: &str) -> Result<Vec<TradeInstruction>, DcasimError> {
        if let Some(reason) = self.errors.get(strategy) {
            return Err(DcasimError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.strategies.get(strategy).cloned().unwrap_or_default())
    }
}

/// Keeps the last report handed to it instead of writing files.
pub struct CapturingReportPort {
    pub captured: RefCell<Option<SimulationReport>>,
}

impl CapturingReportPort {
    pub fn new() -> Self {
        Self {
            captured: RefCell::new(None),
        }
    }
}

impl ReportPort for CapturingReportPort {
    fn write(&self, report: &SimulationReport, output_dir: &Path) -> Result<PathBuf, DcasimError> {
        *self.captured.borrow_mut() = Some(report.clone());
        Ok(output_dir.join("captured.md"))
    }
}
