//! Performance metrics over a completed simulation.
//!
//! Every function here is pure. An undefined result (too little data, zero
//! elapsed time, no contributions) is reported as `NaN` and never blocks the
//! other metrics.

use chrono::NaiveDate;
use log::{debug, warn};

use super::ledger::ContributionEntry;
use super::simulation::DailySeries;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_ROLLING_WINDOW: usize = 252;

const CALENDAR_DAYS_PER_YEAR: f64 = 365.0;
const CONTRIBUTION_PERIODS_PER_YEAR: i32 = 12;

const IRR_MAX_ITERATIONS: usize = 100;
const IRR_BISECTION_ITERATIONS: usize = 200;
const IRR_TOLERANCE: f64 = 1e-10;
const IRR_RATE_FLOOR: f64 = -1.0 + 1e-9;
const IRR_RATE_CEILING: f64 = 1e3;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub total_contributions: f64,
    pub final_value: f64,
    pub money_weighted_return: f64,
    pub sharpe_ratio: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
}

impl Metrics {
    pub fn compute(
        series: &DailySeries,
        contributions: &[ContributionEntry],
        initial_amount: f64,
        annual_risk_free_rate: f64,
    ) -> Self {
        let final_value = series.final_value().unwrap_or(f64::NAN);

        Metrics {
            total_contributions: total_contributions(initial_amount, contributions),
            final_value,
            money_weighted_return: money_weighted_return(
                initial_amount,
                contributions,
                final_value,
            ),
            sharpe_ratio: sharpe_ratio(&series.returns, annual_risk_free_rate),
            cagr: cagr(&series.total_values, &series.dates),
            max_drawdown: max_drawdown(&series.total_values),
        }
    }
}

pub fn total_contributions(initial_amount: f64, contributions: &[ContributionEntry]) -> f64 {
    initial_amount + contributions.iter().map(|c| c.amount).sum::<f64>()
}

/// Annualized IRR of `[-initial, -c1, .., -cn, +final_value]`, one month apart.
///
/// `NaN` without contributions or without a final value. When the solver
/// cannot find a finite rate the result is `0.0`.
pub fn money_weighted_return(
    initial_amount: f64,
    contributions: &[ContributionEntry],
    final_value: f64,
) -> f64 {
    if contributions.is_empty() || !final_value.is_finite() {
        return f64::NAN;
    }

    let mut cashflows = Vec::with_capacity(contributions.len() + 2);
    cashflows.push(-initial_amount);
    cashflows.extend(contributions.iter().map(|c| -c.amount));
    cashflows.push(final_value);

    let Some(rate) = irr(&cashflows) else {
        warn!("IRR did not converge for {} cash flows, reporting 0.0", cashflows.len());
        return 0.0;
    };

    let annual = (1.0 + rate).powi(CONTRIBUTION_PERIODS_PER_YEAR) - 1.0;
    debug!("IRR: periodic={rate:.6}, annual={annual:.6}");
    if annual.is_finite() {
        annual
    } else {
        warn!("IRR annualization overflowed (periodic rate {rate}), reporting 0.0");
        0.0
    }
}

/// Periodic internal rate of return of evenly spaced cash flows.
///
/// Newton-Raphson from zero, falling back to bisection. `None` when the flows
/// do not change sign or no root is found in `(-1, 1000]`.
pub fn irr(cashflows: &[f64]) -> Option<f64> {
    if cashflows.len() < 2 || cashflows.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let has_outflow = cashflows.iter().any(|&c| c < 0.0);
    let has_inflow = cashflows.iter().any(|&c| c > 0.0);
    if !(has_outflow && has_inflow) {
        return None;
    }

    irr_newton(cashflows).or_else(|| irr_bisection(cashflows))
}

/// Future value of the flows at `rate` and its derivative, by Horner's rule.
/// Shares its roots with the NPV for `rate > -1`.
fn future_value(cashflows: &[f64], rate: f64) -> (f64, f64) {
    let growth = 1.0 + rate;
    cashflows
        .iter()
        .fold((0.0, 0.0), |(value, slope), &cf| (value * growth + cf, slope * growth + value))
}

fn irr_newton(cashflows: &[f64]) -> Option<f64> {
    let mut rate = 0.0_f64;
    for _ in 0..IRR_MAX_ITERATIONS {
        let (value, slope) = future_value(cashflows, rate);
        if slope.abs() < 1e-14 {
            return None;
        }
        let next = rate - value / slope;
        if !next.is_finite() || next <= IRR_RATE_FLOOR {
            return None;
        }
        if (next - rate).abs() < IRR_TOLERANCE {
            return Some(next);
        }
        rate = next;
    }
    None
}

fn irr_bisection(cashflows: &[f64]) -> Option<f64> {
    let mut low = IRR_RATE_FLOOR;
    let mut high = 1.0;
    let low_value = future_value(cashflows, low).0;
    let mut high_value = future_value(cashflows, high).0;

    while low_value.signum() == high_value.signum() {
        high *= 2.0;
        if high > IRR_RATE_CEILING {
            return None;
        }
        high_value = future_value(cashflows, high).0;
    }

    for _ in 0..IRR_BISECTION_ITERATIONS {
        let mid = (low + high) / 2.0;
        let mid_value = future_value(cashflows, mid).0;
        if mid_value == 0.0 || (high - low) / 2.0 < IRR_TOLERANCE {
            return Some(mid);
        }
        if mid_value.signum() == low_value.signum() {
            low = mid;
        } else {
            high = mid;
        }
    }
    Some((low + high) / 2.0)
}

/// `(1 + annual)^(1/252) - 1`
pub fn daily_risk_free_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / TRADING_DAYS_PER_YEAR) - 1.0
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `n - 1` in the denominator.
fn sample_stddev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}

/// Annualized Sharpe ratio of daily returns. `NaN` with fewer than two
/// observations or zero dispersion.
pub fn sharpe_ratio(returns: &[f64], annual_risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return f64::NAN;
    }
    let stddev = sample_stddev(returns);
    if stddev == 0.0 || !stddev.is_finite() {
        return f64::NAN;
    }
    let excess = mean(returns) - daily_risk_free_rate(annual_risk_free_rate);
    TRADING_DAYS_PER_YEAR.sqrt() * excess / stddev
}

/// Compound annual growth between the first and last value, over calendar
/// days. `NaN` when no time elapsed or the starting value is not positive.
pub fn cagr(values: &[f64], dates: &[NaiveDate]) -> f64 {
    let (Some(&first_value), Some(&final_value)) = (values.first(), values.last()) else {
        return f64::NAN;
    };
    let (Some(&first_date), Some(&last_date)) = (dates.first(), dates.last()) else {
        return f64::NAN;
    };

    let days = (last_date - first_date).num_days();
    if days <= 0 || first_value <= 0.0 {
        return f64::NAN;
    }
    (final_value / first_value).powf(CALENDAR_DAYS_PER_YEAR / days as f64) - 1.0
}

/// Largest decline from a running peak, as a fraction of that peak.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub sharpe: f64,
    pub volatility: f64,
    pub cumulative_return: f64,
}

/// Trailing-window statistics of daily returns, aligned to the series dates.
/// Points before the window fills are `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingMetrics {
    pub window: usize,
    pub points: Vec<RollingPoint>,
}

impl RollingMetrics {
    pub fn compute(series: &DailySeries, window: usize) -> Self {
        let annualizer = TRADING_DAYS_PER_YEAR.sqrt();
        let points = series
            .dates
            .iter()
            .enumerate()
            .map(|(i, &date)| {
                if window < 2 || i + 1 < window {
                    return RollingPoint {
                        date,
                        sharpe: f64::NAN,
                        volatility: f64::NAN,
                        cumulative_return: f64::NAN,
                    };
                }
                let slice = &series.returns[i + 1 - window..=i];
                let stddev = sample_stddev(slice);
                let sharpe = if stddev > 0.0 {
                    annualizer * mean(slice) / stddev
                } else {
                    f64::NAN
                };
                RollingPoint {
                    date,
                    sharpe,
                    volatility: stddev * annualizer,
                    cumulative_return: slice.iter().map(|r| 1.0 + r).product::<f64>() - 1.0,
                }
            })
            .collect();

        RollingMetrics { window, points }
    }

    /// Most recent point with a full window.
    pub fn latest(&self) -> Option<&RollingPoint> {
        self.points.last().filter(|p| !p.volatility.is_nan())
    }
}
