use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PnlError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Parse error: period label '{label}' — {reason}")]
    ParseError { label: String, reason: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid number in '{field}': '{value}'")]
    InvalidNumber { field: String, value: String },

    #[error("Negative amount in '{field}': {value}")]
    NegativeAmount { field: String, value: Decimal },

    #[error("Duplicate period: {label} already loaded")]
    DuplicatePeriod { label: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Anomalous growth base for {line_item}: first value {first_value}, last value {last_value}")]
    AnomalousGrowthBase {
        line_item: String,
        first_value: Decimal,
        last_value: Decimal,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PnlError {
    fn from(e: serde_json::Error) -> Self {
        PnlError::SerializationError(e.to_string())
    }
}
