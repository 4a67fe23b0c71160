//! Run configuration.

use wrongpath_engine::ResolutionThreshold;
use wrongpath_state::DEFAULT_MEMORY_BITS;

/// Default load address for raw binaries.
pub const DEFAULT_RAW_BASE: u64 = 0x8000_0000;

/// Settings for one monitored run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunConfig {
    /// Wrong-path instructions allowed before rollback.
    pub threshold: ResolutionThreshold,
    /// Guest memory is `2^memory_bits` bytes.
    pub memory_bits: u8,
    /// Stop after this many observed instructions.
    pub max_insns: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: ResolutionThreshold::ZERO,
            memory_bits: DEFAULT_MEMORY_BITS,
            max_insns: None,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: ResolutionThreshold) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_memory_bits(mut self, bits: u8) -> Self {
        self.memory_bits = bits;
        self
    }

    #[must_use]
    pub const fn with_max_insns(mut self, limit: u64) -> Self {
        self.max_insns = Some(limit);
        self
    }
}
