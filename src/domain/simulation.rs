//! Day-by-day simulation driver.
//!
//! For every trading date and every registered strategy the driver applies,
//! in order: the monthly contribution (on the 1st of the month), the scheduled
//! trade, then records the valuation and the contribution-adjusted daily
//! return. A failure on one day for one strategy is recorded as a skipped day
//! and the run carries on.

use chrono::{Datelike, NaiveDate};
use log::{debug, error, info, warn};

use super::error::{DcasimError, LedgerError};
use super::ledger::Ledger;
use super::metrics::DEFAULT_RISK_FREE_RATE;
use super::price::PriceSeries;
use super::trade::{TradeInstruction, TradeSchedule};

/// Parameters fixed for the lifetime of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_amount: f64,
    pub monthly_contribution: f64,
    pub annual_risk_free_rate: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_amount: 30_000.0,
            monthly_contribution: 1_000.0,
            annual_risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub total_value: f64,
    pub position_value: f64,
    pub cash_value: f64,
    pub daily_return: f64,
}

/// Index-aligned columns of one strategy's recorded days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailySeries {
    pub dates: Vec<NaiveDate>,
    pub total_values: Vec<f64>,
    pub position_values: Vec<f64>,
    pub cash_values: Vec<f64>,
    pub returns: Vec<f64>,
}

impl DailySeries {
    pub fn with_capacity(capacity: usize) -> Self {
        DailySeries {
            dates: Vec::with_capacity(capacity),
            total_values: Vec::with_capacity(capacity),
            position_values: Vec::with_capacity(capacity),
            cash_values: Vec::with_capacity(capacity),
            returns: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: &DailyRecord) {
        self.dates.push(record.date);
        self.total_values.push(record.total_value);
        self.position_values.push(record.position_value);
        self.cash_values.push(record.cash_value);
        self.returns.push(record.daily_return);
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn final_value(&self) -> Option<f64> {
        self.total_values.last().copied()
    }

    pub fn record(&self, index: usize) -> Option<DailyRecord> {
        Some(DailyRecord {
            date: *self.dates.get(index)?,
            total_value: *self.total_values.get(index)?,
            position_value: *self.position_values.get(index)?,
            cash_value: *self.cash_values.get(index)?,
            daily_return: *self.returns.get(index)?,
        })
    }
}

/// A scheduled trade that could not be filled. The day is still recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedTrade {
    pub date: NaiveDate,
    pub amount: f64,
    pub reason: LedgerError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome {
    Recorded {
        record: DailyRecord,
        rejected_trade: Option<RejectedTrade>,
    },
    Skipped(SkippedDay),
}

/// Everything the driver produced for one strategy.
#[derive(Debug, Clone)]
pub struct StrategyRun {
    pub name: String,
    pub series: DailySeries,
    pub skipped_days: Vec<SkippedDay>,
    pub rejected_trades: Vec<RejectedTrade>,
}

/// Per-strategy state carried from one day to the next.
struct StrategyCursor<'a> {
    name: &'a str,
    schedule: &'a TradeSchedule,
    prev_total_value: f64,
    has_history: bool,
}

pub struct Simulator {
    config: SimulationConfig,
    prices: PriceSeries,
    calendar: Vec<NaiveDate>,
    ledger: Ledger,
    runs: Vec<StrategyRun>,
}

impl Simulator {
    /// Uses every priced date as the trading calendar.
    pub fn new(config: SimulationConfig, prices: PriceSeries) -> Self {
        let calendar = prices.trading_calendar();
        let ledger = Ledger::new(config.initial_amount);
        Simulator {
            config,
            prices,
            calendar,
            ledger,
            runs: Vec::new(),
        }
    }

    /// Uses an explicit calendar, which must be non-empty and strictly
    /// ascending. Dates without a close price become skipped days.
    pub fn with_calendar(
        config: SimulationConfig,
        prices: PriceSeries,
        calendar: Vec<NaiveDate>,
    ) -> Result<Self, DcasimError> {
        if calendar.is_empty() {
            return Err(DcasimError::Data {
                reason: "trading calendar is empty".into(),
            });
        }
        if let Some(w) = calendar.windows(2).find(|w| w[0] >= w[1]) {
            return Err(DcasimError::Data {
                reason: format!(
                    "trading calendar must be strictly ascending ({} then {})",
                    w[0], w[1]
                ),
            });
        }

        let mut simulator = Simulator::new(config, prices);
        simulator.calendar = calendar;
        Ok(simulator)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn prices(&self) -> &PriceSeries {
        &self.prices
    }

    pub fn calendar(&self) -> &[NaiveDate] {
        &self.calendar
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Runs one strategy over the whole calendar. Empty input and a name that
    /// was already run are rejected before any ledger state is created.
    pub fn run_strategy(
        &mut self,
        name: &str,
        instructions: &[TradeInstruction],
    ) -> Result<&StrategyRun, DcasimError> {
        if self.ledger.is_initialized(name) {
            return Err(DcasimError::DuplicateStrategy {
                strategy: name.to_string(),
            });
        }
        let schedule = TradeSchedule::from_instructions(name, instructions)?;
        self.ledger.initialize(name);
        debug!("{name}: {} scheduled trade dates", schedule.len());

        let mut run = StrategyRun {
            name: name.to_string(),
            series: DailySeries::with_capacity(self.calendar.len()),
            skipped_days: Vec::new(),
            rejected_trades: Vec::new(),
        };
        let mut cursor = StrategyCursor {
            name,
            schedule: &schedule,
            prev_total_value: self.config.initial_amount,
            has_history: false,
        };

        for &date in &self.calendar {
            match process_day(&mut self.ledger, &self.prices, &self.config, &mut cursor, date) {
                DayOutcome::Recorded {
                    record,
                    rejected_trade,
                } => {
                    run.series.push(&record);
                    run.rejected_trades.extend(rejected_trade);
                }
                DayOutcome::Skipped(skipped) => run.skipped_days.push(skipped),
            }
        }

        info!(
            "{name}: {} days recorded, {} skipped, {} trades rejected",
            run.series.len(),
            run.skipped_days.len(),
            run.rejected_trades.len()
        );

        self.runs.push(run);
        Ok(&self.runs[self.runs.len() - 1])
    }

    pub fn result(&self, name: &str) -> Option<&StrategyRun> {
        self.runs.iter().find(|r| r.name == name)
    }

    /// Completed runs in registration order.
    pub fn results(&self) -> &[StrategyRun] {
        &self.runs
    }
}

fn process_day(
    ledger: &mut Ledger,
    prices: &PriceSeries,
    config: &SimulationConfig,
    cursor: &mut StrategyCursor,
    date: NaiveDate,
) -> DayOutcome {
    match try_process_day(ledger, prices, config, cursor, date) {
        Ok((record, rejected_trade)) => {
            cursor.prev_total_value = record.total_value;
            cursor.has_history = true;
            DayOutcome::Recorded {
                record,
                rejected_trade,
            }
        }
        Err(e) => {
            error!("Error on {date} for {}: {e}", cursor.name);
            DayOutcome::Skipped(SkippedDay {
                date,
                reason: e.to_string(),
            })
        }
    }
}

fn try_process_day(
    ledger: &mut Ledger,
    prices: &PriceSeries,
    config: &SimulationConfig,
    cursor: &StrategyCursor,
    date: NaiveDate,
) -> Result<(DailyRecord, Option<RejectedTrade>), DcasimError> {
    let name = cursor.name;
    let price = prices
        .close_on(date)
        .ok_or(DcasimError::MissingPrice { date })?;
    // Checked before the contribution so a skipped day leaves the ledger untouched.
    if !price.is_finite() || price <= 0.0 {
        return Err(LedgerError::InvalidPrice {
            strategy: name.to_string(),
            price,
        }
        .into());
    }

    let is_contribution_day = date.day() == 1;
    let mut pre_contrib_value = None;
    if is_contribution_day {
        pre_contrib_value = Some(ledger.value(name, price)?);
        ledger.apply_contribution(name, date, config.monthly_contribution)?;
    }

    let mut rejected_trade = None;
    if let Some(amount) = cursor.schedule.amount_on(date) {
        match ledger.execute_trade(name, date, amount, price) {
            Ok(_) => {}
            Err(e @ LedgerError::InsufficientFunds { .. }) => {
                warn!("Trade skipped for {name} on {date}: {e}");
                rejected_trade = Some(RejectedTrade {
                    date,
                    amount,
                    reason: e,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let valuation = ledger.valuation(name, price)?;
    let total_value = valuation.total_value;

    let daily_return = match pre_contrib_value {
        Some(pre) if cursor.has_history => {
            if pre > 0.0 {
                (total_value - config.monthly_contribution) / pre - 1.0
            } else {
                0.0
            }
        }
        _ => {
            if cursor.prev_total_value > 0.0 {
                total_value / cursor.prev_total_value - 1.0
            } else {
                0.0
            }
        }
    };

    debug!(
        "{name} on {date}: cash={:.2}, position={:.2}, total={total_value:.2}",
        valuation.cash_value, valuation.position_value
    );

    Ok((
        DailyRecord {
            date,
            total_value,
            position_value: valuation.position_value,
            cash_value: valuation.cash_value,
            daily_return,
        },
        rejected_trade,
    ))
}
