//! Error types for the Satoshi Flipper engine
//!
//! Every failure in the flip core is synchronous and leaves engine state untouched.

use crate::treasury::Amount;
use thiserror::Error;

/// Root error type for all flipper operations
#[derive(Debug, Error)]
pub enum FlipperError {
    /// Wager rejected by the flip engine or one of its extensions
    #[error("Flip rejected: {0}")]
    Flip(#[from] FlipError),

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Malformed decimal amount
    #[error("Invalid amount: {0}")]
    AmountParse(#[from] AmountParseError),

    /// Export or import of round data failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Rejections raised before a wager touches any state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlipError {
    #[error("Bet too low: {wager} is below the minimum of {min}")]
    BetTooLow { wager: Amount, min: Amount },

    #[error("Bet too high: {wager} exceeds the maximum of {max}")]
    BetTooHigh { wager: Amount, max: Amount },

    #[error("Invalid player id: {reason}")]
    InvalidPlayerId { reason: String },

    #[error("Feature disabled: {feature}")]
    FeatureDisabled { feature: &'static str },

    #[error("Wager {wager} outside the {feature} range [{min}, {max}]")]
    WagerOutOfRangeForFeature {
        feature: &'static str,
        wager: Amount,
        min: Amount,
        max: Amount,
    },
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Decimal amount parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("empty amount")]
    Empty,

    #[error("unexpected character in '{0}'")]
    InvalidDigit(String),

    #[error("'{0}' has more than 18 fractional digits")]
    TooManyDecimals(String),

    #[error("'{0}' does not fit in the amount range")]
    Overflow(String),
}

impl From<std::io::Error> for FlipperError {
    fn from(e: std::io::Error) -> Self {
        FlipperError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

// Convenience type alias for Results
pub type FlipperResult<T> = Result<T, FlipperError>;
