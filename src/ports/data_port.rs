//! Data access port trait.

use crate::domain::error::DcasimError;
use crate::domain::price::PriceSeries;
use crate::domain::trade::TradeInstruction;

pub trait DataPort {
    fn fetch_prices(&self) -> Result<PriceSeries, DcasimError>;

    /// Strategy names, in the order they should be registered.
    fn list_strategies(&self) -> Result<Vec<String>, DcasimError>;

    fn fetch_trades(&self, strategy: &str) -> Result<Vec<TradeInstruction>, DcasimError>;
}
