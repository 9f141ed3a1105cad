//! Per-strategy cash and position accounting.
//!
//! The ledger is the only owner of strategy balances. Every mutation goes
//! through a typed operation keyed by strategy id; strategies never share
//! state, except for the month-deduplicated global contribution log.

use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};

use super::error::LedgerError;

/// Calendar month as `(year, month)`.
pub type Period = (i32, u32);

fn period_of(date: NaiveDate) -> Period {
    (date.year(), date.month())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributionEntry {
    pub date: NaiveDate,
    pub amount: f64,
    /// Initial amount plus every contribution up to and including this one.
    pub cumulative: f64,
}

/// Point-in-time breakdown of a strategy's value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub position_value: f64,
    pub cash_value: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyState {
    cash: f64,
    position: f64,
    contributions: Vec<ContributionEntry>,
    last_contribution_period: Option<Period>,
}

impl StrategyState {
    fn new(initial_amount: f64) -> Self {
        StrategyState {
            cash: initial_amount,
            position: 0.0,
            contributions: Vec::new(),
            last_contribution_period: None,
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn contributions(&self) -> &[ContributionEntry] {
        &self.contributions
    }

    pub fn last_contribution_period(&self) -> Option<Period> {
        self.last_contribution_period
    }

    pub fn valuation(&self, price: f64) -> Valuation {
        let position_value = self.position * price;
        Valuation {
            position_value,
            cash_value: self.cash,
            total_value: position_value + self.cash,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    initial_amount: f64,
    strategies: HashMap<String, StrategyState>,
    registration_order: Vec<String>,
    monthly_flows: BTreeMap<Period, (NaiveDate, f64)>,
}

impl Ledger {
    pub fn new(initial_amount: f64) -> Self {
        Ledger {
            initial_amount,
            strategies: HashMap::new(),
            registration_order: Vec::new(),
            monthly_flows: BTreeMap::new(),
        }
    }

    pub fn initial_amount(&self) -> f64 {
        self.initial_amount
    }

    /// Creates the strategy with `cash = initial_amount`. Returns `false` if it
    /// already existed, in which case nothing changes.
    pub fn initialize(&mut self, strategy: &str) -> bool {
        if self.strategies.contains_key(strategy) {
            return false;
        }
        info!("Initializing strategy: {strategy}");
        self.strategies
            .insert(strategy.to_string(), StrategyState::new(self.initial_amount));
        self.registration_order.push(strategy.to_string());
        true
    }

    pub fn is_initialized(&self, strategy: &str) -> bool {
        self.strategies.contains_key(strategy)
    }

    /// Strategy ids in the order they were initialized.
    pub fn strategy_ids(&self) -> &[String] {
        &self.registration_order
    }

    pub fn state(&self, strategy: &str) -> Result<&StrategyState, LedgerError> {
        self.strategies
            .get(strategy)
            .ok_or_else(|| LedgerError::UninitializedStrategy {
                strategy: strategy.to_string(),
            })
    }

    fn state_mut(&mut self, strategy: &str) -> Result<&mut StrategyState, LedgerError> {
        self.strategies
            .get_mut(strategy)
            .ok_or_else(|| LedgerError::UninitializedStrategy {
                strategy: strategy.to_string(),
            })
    }

    /// Credits `amount` once per calendar month. A date in the same or an
    /// earlier month than the last credited one is a no-op returning `false`.
    pub fn apply_contribution(
        &mut self,
        strategy: &str,
        date: NaiveDate,
        amount: f64,
    ) -> Result<bool, LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount {
                strategy: strategy.to_string(),
                amount,
            });
        }

        let initial_amount = self.initial_amount;
        let period = period_of(date);
        let state = self.state_mut(strategy)?;

        if let Some(last) = state.last_contribution_period {
            if period <= last {
                return Ok(false);
            }
        }

        state.cash += amount;
        let previous = state
            .contributions
            .last()
            .map(|c| c.cumulative)
            .unwrap_or(initial_amount);
        state.contributions.push(ContributionEntry {
            date,
            amount,
            cumulative: previous + amount,
        });
        state.last_contribution_period = Some(period);

        debug!(
            "Contribution for {strategy} on {date}: amount={amount:.2}, cash={:.2}",
            state.cash
        );

        self.monthly_flows.entry(period).or_insert((date, amount));
        Ok(true)
    }

    /// Buys `dollar_amount / price` units. The whole amount must be covered by
    /// cash; there is no partial fill. Returns the number of units bought.
    pub fn execute_trade(
        &mut self,
        strategy: &str,
        date: NaiveDate,
        dollar_amount: f64,
        price: f64,
    ) -> Result<f64, LedgerError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidPrice {
                strategy: strategy.to_string(),
                price,
            });
        }
        if !dollar_amount.is_finite() || dollar_amount < 0.0 {
            return Err(LedgerError::InvalidAmount {
                strategy: strategy.to_string(),
                amount: dollar_amount,
            });
        }

        let state = self.state_mut(strategy)?;
        if dollar_amount > state.cash {
            return Err(LedgerError::InsufficientFunds {
                strategy: strategy.to_string(),
                requested: dollar_amount,
                available: state.cash,
            });
        }

        let shares = dollar_amount / price;
        state.cash -= dollar_amount;
        state.position += shares;

        debug!(
            "Trade executed for {strategy} on {date}: amount={dollar_amount:.2}, price={price:.2}, shares={shares:.4}"
        );
        Ok(shares)
    }

    /// `position * price + cash`.
    pub fn value(&self, strategy: &str, price: f64) -> Result<f64, LedgerError> {
        Ok(self.valuation(strategy, price)?.total_value)
    }

    pub fn valuation(&self, strategy: &str, price: f64) -> Result<Valuation, LedgerError> {
        Ok(self.state(strategy)?.valuation(price))
    }

    pub fn cash(&self, strategy: &str) -> Result<f64, LedgerError> {
        Ok(self.state(strategy)?.cash)
    }

    pub fn position(&self, strategy: &str) -> Result<f64, LedgerError> {
        Ok(self.state(strategy)?.position)
    }

    pub fn contributions(&self, strategy: &str) -> Result<&[ContributionEntry], LedgerError> {
        Ok(self.state(strategy)?.contributions())
    }

    /// One entry per calendar month in which any strategy received a
    /// contribution: the cash a never-invested portfolio would hold.
    pub fn global_contributions(&self) -> Vec<ContributionEntry> {
        let mut cumulative = self.initial_amount;
        self.monthly_flows
            .values()
            .map(|&(date, amount)| {
                cumulative += amount;
                ContributionEntry {
                    date,
                    amount,
                    cumulative,
                }
            })
            .collect()
    }
}
