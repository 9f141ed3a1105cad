//! Domain error types.

use chrono::NaiveDate;

/// Failures raised by ledger operations on a single strategy.
///
/// These are day-level errors: the simulation driver logs them and skips the
/// affected day rather than aborting the run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("strategy {strategy} not initialized")]
    UninitializedStrategy { strategy: String },

    #[error(
        "insufficient cash for trade in {strategy}: requested {requested:.2}, available {available:.2}"
    )]
    InsufficientFunds {
        strategy: String,
        requested: f64,
        available: f64,
    },

    #[error("invalid price {price} for {strategy}")]
    InvalidPrice { strategy: String, price: f64 },

    #[error("invalid trade amount {amount} for {strategy}")]
    InvalidAmount { strategy: String, amount: f64 },
}

/// Top-level error type for dcasim.
#[derive(Debug, thiserror::Error)]
pub enum DcasimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no price data available")]
    NoPriceData,

    #[error("no close price for {date}")]
    MissingPrice { date: NaiveDate },

    #[error("empty trade data for {strategy}")]
    EmptyTradeInput { strategy: String },

    #[error("invalid trade amount {amount} on {date} for {strategy}")]
    InvalidTrade {
        strategy: String,
        date: NaiveDate,
        amount: f64,
    },

    #[error("strategy {strategy} already registered")]
    DuplicateStrategy { strategy: String },

    #[error("no strategy produced results")]
    NoResults,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DcasimError {
    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            DcasimError::Io(_) => 1,
            DcasimError::ConfigParse { .. } | DcasimError::ConfigInvalid { .. } => 2,
            DcasimError::Data { .. }
            | DcasimError::NoPriceData
            | DcasimError::MissingPrice { .. } => 3,
            DcasimError::EmptyTradeInput { .. }
            | DcasimError::InvalidTrade { .. }
            | DcasimError::DuplicateStrategy { .. }
            | DcasimError::NoResults => 4,
            DcasimError::Ledger(_) => 5,
        }
    }
}

impl From<&DcasimError> for std::process::ExitCode {
    fn from(err: &DcasimError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
