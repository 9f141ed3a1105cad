//! Everything a report writer needs from a finished simulation.

use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeMap;

use super::ledger::ContributionEntry;
use super::metrics::{Metrics, RollingMetrics};
use super::price::PricePoint;
use super::simulation::{DailySeries, SimulationConfig, Simulator, StrategyRun};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// Compounds the daily time-weighted returns within each calendar month.
pub fn compute_monthly_returns(series: &DailySeries) -> Vec<MonthlyReturn> {
    let mut growth: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for (date, r) in series.dates.iter().zip(&series.returns) {
        *growth.entry((date.year(), date.month())).or_insert(1.0) *= 1.0 + r;
    }

    growth
        .into_iter()
        .map(|((year, month), g)| MonthlyReturn {
            year,
            month,
            return_pct: g - 1.0,
        })
        .collect()
}

/// `Π(1 + r) - 1` at every recorded day.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |growth, r| {
            *growth *= 1.0 + r;
            Some(*growth - 1.0)
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub name: String,
    pub metrics: Metrics,
    pub rolling: RollingMetrics,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub series: DailySeries,
    pub contributions: Vec<ContributionEntry>,
    pub rejected_trades: usize,
    pub skipped_days: usize,
}

/// A strategy that never reached the simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedStrategy {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub generated_at: NaiveDateTime,
    pub config: SimulationConfig,
    pub prices: Vec<PricePoint>,
    pub global_contributions: Vec<ContributionEntry>,
    pub strategies: Vec<StrategyReport>,
    pub failed: Vec<FailedStrategy>,
}

impl SimulationReport {
    pub fn build(
        simulator: &Simulator,
        rolling_window: usize,
        failed: Vec<FailedStrategy>,
        generated_at: NaiveDateTime,
    ) -> Self {
        let config = simulator.config().clone();
        let strategies = simulator
            .results()
            .iter()
            .map(|run| strategy_report(simulator, run, rolling_window))
            .collect();

        SimulationReport {
            generated_at,
            config,
            prices: simulator.prices().points().to_vec(),
            global_contributions: simulator.ledger().global_contributions(),
            strategies,
            failed,
        }
    }
}

fn strategy_report(simulator: &Simulator, run: &StrategyRun, rolling_window: usize) -> StrategyReport {
    let config = simulator.config();
    // Every completed run was initialized in this ledger.
    let contributions = simulator
        .ledger()
        .contributions(&run.name)
        .map(<[ContributionEntry]>::to_vec)
        .unwrap_or_default();

    StrategyReport {
        name: run.name.clone(),
        metrics: Metrics::compute(
            &run.series,
            &contributions,
            config.initial_amount,
            config.annual_risk_free_rate,
        ),
        rolling: RollingMetrics::compute(&run.series, rolling_window),
        monthly_returns: compute_monthly_returns(&run.series),
        series: run.series.clone(),
        contributions,
        rejected_trades: run.rejected_trades.len(),
        skipped_days: run.skipped_days.len(),
    }
}
