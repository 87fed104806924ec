use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("Malformed ledger date '{0}': expected DD/MM/YYYY")]
    DateParse(String),

    #[error("Insufficient history: {available} months available, {required} required for the balancing horizon")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Ledger contains {0} transactions, at least {1} required")]
    InsufficientTransactions(usize, usize),

    #[error("Cannot project next occurrence for '{0}': naive projection is stale and the delta distribution has no remaining mass")]
    UnresolvableNextOccurrence(String),

    #[error("Declared cycle '{0}' has a zero-day period")]
    InvalidPeriod(String),

    #[error("Ledger read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PlannerError>;
