use thiserror::Error;

/// Scoring engine error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// The customer has no transactions inside the selected recent window
    #[error("no transactions in the recent window for customer {customer_id}")]
    NoTransactionsInWindow {
        /// The customer that could not be analysed
        customer_id: String,
    },

    /// The engine configuration is unusable
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
