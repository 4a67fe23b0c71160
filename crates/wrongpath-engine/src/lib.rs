//! Wrong-path speculation engine.
//!
//! Every branch with a fallthrough is deliberately mispredicted: the engine
//! checkpoints the correct continuation, sends execution down the other
//! direction, and restores the checkpoint once more than
//! [`ResolutionThreshold`] instructions have run on the wrong path.
//!
//! The engine never executes anything itself. A host (an interpreter, a
//! binary instrumentation layer) calls the hooks before each instruction and
//! acts on the returned [`Transition`]:
//!
//! ```ignore
//! use wrongpath_engine::{Hook, SpeculationEngine, Transition};
//!
//! let mut engine = SpeculationEngine::new(threshold, sink);
//! engine.start();
//! loop {
//!     let transition = match hook {
//!         Hook::Branch => engine.on_branch(&mut ctx, outcome),
//!         Hook::Plain => engine.on_instruction(&ctx),
//!     };
//!     match transition {
//!         Transition::Continue => { /* execute the instruction */ }
//!         Transition::Speculate(point) | Transition::Rollback(point) => ctx = point.context,
//!     }
//! }
//! engine.finish();
//! ```
//!
//! One engine drives one thread of execution. Engines share nothing, so a
//! multi-threaded target gets one engine per thread.

mod base;
mod checkpoint;
mod context;
mod engine;
mod error;
mod hook;
mod path;
mod threshold;
mod trace;

pub use base::BaseAddress;
pub use checkpoint::CheckpointStore;
pub use context::{ExecutionContext, ExecutionPoint, Transition};
pub use engine::{SpeculationEngine, SpeculationStats};
pub use error::{ConfigError, Result};
pub use hook::{BranchOutcome, Hook, InstrProps};
pub use path::PathState;
pub use threshold::ResolutionThreshold;
pub use trace::{Disposition, NoopSink, RecordingSink, TextSink, TraceEvent, TraceSink};
