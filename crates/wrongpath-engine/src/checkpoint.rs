//! Single-slot checkpoint storage.

use crate::ExecutionContext;

/// Holds at most one saved right-path context.
///
/// Saving while a checkpoint is live replaces it; the older continuation is
/// gone for good.
#[derive(Clone, Debug)]
pub struct CheckpointStore<C> {
    slot: Option<C>,
}

impl<C: ExecutionContext> CheckpointStore<C> {
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Snapshot `context`, returning the checkpoint it replaced.
    pub fn save(&mut self, context: &C) -> Option<C> {
        self.slot.replace(context.clone())
    }

    /// Hand the checkpoint over to a rollback, emptying the store.
    pub const fn take(&mut self) -> Option<C> {
        self.slot.take()
    }

    pub const fn get(&self) -> Option<&C> {
        self.slot.as_ref()
    }

    /// Instruction pointer a rollback would resume at.
    pub fn resume_address(&self) -> Option<u64> {
        self.slot.as_ref().map(ExecutionContext::instruction_pointer)
    }

    pub const fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl<C: ExecutionContext> Default for CheckpointStore<C> {
    fn default() -> Self {
        Self::new()
    }
}
