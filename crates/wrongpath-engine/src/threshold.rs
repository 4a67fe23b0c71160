//! Branch resolution threshold.

use std::fmt::{self, Display};
use std::str::FromStr;

use crate::ConfigError;

/// Number of instructions allowed on the wrong path before rollback.
///
/// Rollback fires when the wrong-path count *exceeds* the threshold, so a
/// threshold of `n` lets `n + 1` instructions be reached on the wrong path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolutionThreshold(u32);

impl ResolutionThreshold {
    pub const ZERO: Self = Self(0);

    pub const fn new(instructions: u32) -> Self {
        Self(instructions)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for ResolutionThreshold {
    type Err = ConfigError;

    /// Parse a threshold, rejecting empty and negative values instead of
    /// clamping them.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::MissingThreshold);
        }
        let value: i64 = s
            .parse()
            .map_err(|_| ConfigError::InvalidThreshold(s.to_string()))?;
        if value < 0 {
            return Err(ConfigError::NegativeThreshold(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ConfigError::ThresholdTooLarge(value))
    }
}

impl Display for ResolutionThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
