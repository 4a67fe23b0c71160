//! Wrong-path execution monitor for RV64IM programs.
//!
//! Interprets a guest program and deliberately mispredicts every conditional
//! branch and call: the correct continuation is checkpointed, execution runs
//! down the other direction for a bounded number of instructions, then the
//! checkpoint is restored. Register state comes back from the checkpoint and
//! memory from a store journal.
//!
//! # Example
//!
//! ```ignore
//! use wrongpath::{RunConfig, Runner};
//! use wrongpath_engine::{ResolutionThreshold, TextSink};
//!
//! let config = RunConfig::new().with_threshold(ResolutionThreshold::new(8));
//! let mut runner = Runner::from_file("program.elf", None, config, TextSink::new(std::io::stdout()))?;
//! let result = runner.run()?;
//! println!("{} speculations", result.stats.speculations);
//! ```

pub use wrongpath_elf::{ElfError, ElfImage};
pub use wrongpath_engine::{
    ConfigError, Disposition, NoopSink, RecordingSink, ResolutionThreshold, SpeculationStats,
    TextSink, TraceEvent, TraceSink,
};
pub use wrongpath_state::{CpuContext, GuestMemory, MemoryError};

mod config;
mod error;
pub mod exec;
pub mod metrics;
mod runner;
pub mod syscalls;

pub use config::{DEFAULT_RAW_BASE, RunConfig};
pub use error::{Error, Result};
pub use runner::{RunResult, Runner, StopReason, load_program};
