//! Execution contexts and control transfers.

/// Register state the engine can checkpoint and redirect.
///
/// `Clone` must produce a deep snapshot: a saved checkpoint may not alias the
/// live context it was taken from.
pub trait ExecutionContext: Clone {
    /// Address of the next instruction to execute.
    fn instruction_pointer(&self) -> u64;

    /// Point the context at a different instruction.
    fn set_instruction_pointer(&mut self, addr: u64);
}

/// A place to resume execution: an address and the full register state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionPoint<C> {
    pub address: u64,
    pub context: C,
}

impl<C: ExecutionContext> ExecutionPoint<C> {
    /// Resume point at the context's own instruction pointer.
    pub fn new(context: C) -> Self {
        Self {
            address: context.instruction_pointer(),
            context,
        }
    }
}

/// What the host must do after a hook returns.
///
/// Both redirecting variants abandon the instruction the hook was called
/// for; the host resumes at the carried point instead of executing it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use]
pub enum Transition<C> {
    /// Execute the current instruction normally.
    Continue,
    /// Resume on the wrong path of the branch just seen.
    Speculate(ExecutionPoint<C>),
    /// Resume at the checkpointed right-path continuation.
    Rollback(ExecutionPoint<C>),
}

impl<C> Transition<C> {
    pub const fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// The point to resume at, if control is being transferred.
    pub const fn target(&self) -> Option<&ExecutionPoint<C>> {
        match self {
            Self::Continue => None,
            Self::Speculate(point) | Self::Rollback(point) => Some(point),
        }
    }

    pub fn into_target(self) -> Option<ExecutionPoint<C>> {
        match self {
            Self::Continue => None,
            Self::Speculate(point) | Self::Rollback(point) => Some(point),
        }
    }
}
