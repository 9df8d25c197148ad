use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Unsupported currency code '{0}': expected one of BRL, USD, EUR, SOJA")]
    UnsupportedCurrency(String),

    #[error("No exchange rate to BRL available for {currency}")]
    MissingExchangeRate { currency: String },

    #[error("Invalid exchange rate {rate} for {currency}: must be a finite number greater than 0.0")]
    InvalidExchangeRate { currency: String, rate: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
