//! Sparse per-strategy trade schedules.

use crate::domain::error::DcasimError;
use chrono::NaiveDate;
use log::warn;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// One row of strategy input: invest `amount` dollars on `date`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeInstruction {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Dollar amounts to invest, keyed by date.
///
/// Rows sharing a date are summed into a single instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSchedule {
    by_date: BTreeMap<NaiveDate, f64>,
}

impl TradeSchedule {
    pub fn from_instructions(
        strategy: &str,
        instructions: &[TradeInstruction],
    ) -> Result<Self, DcasimError> {
        if instructions.is_empty() {
            return Err(DcasimError::EmptyTradeInput {
                strategy: strategy.to_string(),
            });
        }

        let mut by_date = BTreeMap::new();
        for instruction in instructions {
            if !instruction.amount.is_finite() || instruction.amount < 0.0 {
                return Err(DcasimError::InvalidTrade {
                    strategy: strategy.to_string(),
                    date: instruction.date,
                    amount: instruction.amount,
                });
            }
            match by_date.entry(instruction.date) {
                Entry::Vacant(slot) => {
                    slot.insert(instruction.amount);
                }
                Entry::Occupied(mut slot) => {
                    warn!(
                        "{strategy}: duplicate trade date {}, amounts are summed",
                        instruction.date
                    );
                    *slot.get_mut() += instruction.amount;
                }
            }
        }

        Ok(Self { by_date })
    }

    pub fn amount_on(&self, date: NaiveDate) -> Option<f64> {
        self.by_date.get(&date).copied()
    }

    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
