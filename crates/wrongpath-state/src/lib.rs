//! Guest machine state for the wrong-path interpreter.
//!
//! [`CpuContext`] is the register file the speculation engine checkpoints;
//! [`GuestMemory`] is flat guest memory that can journal stores so a
//! rollback can put memory back the way the correct path left it.

mod memory;
mod state;

pub use memory::{DEFAULT_MEMORY_BITS, GuestMemory, MAX_MEMORY_BITS, MIN_MEMORY_BITS, MemoryError};
pub use state::CpuContext;
