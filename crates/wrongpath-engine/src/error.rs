use thiserror::Error;

/// Startup configuration errors. All of them are fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("resolution threshold is missing")]
    MissingThreshold,
    #[error("resolution threshold must be non-negative, got {0}")]
    NegativeThreshold(i64),
    #[error("resolution threshold {0} is too large")]
    ThresholdTooLarge(i64),
    #[error("invalid resolution threshold '{0}'")]
    InvalidThreshold(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
