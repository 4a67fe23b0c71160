//! Instrumentation-time classification and execution-time branch outcomes.

/// Static properties of an instruction, known when it is first decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstrProps {
    pub is_control_flow: bool,
    pub has_fallthrough: bool,
}

/// Which engine hook runs before an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Hook {
    /// [`SpeculationEngine::on_branch`](crate::SpeculationEngine::on_branch).
    Branch,
    /// [`SpeculationEngine::on_instruction`](crate::SpeculationEngine::on_instruction).
    Plain,
}

impl Hook {
    /// Only control transfers with a sequential alternative are speculated.
    pub const fn for_props(props: InstrProps) -> Self {
        if props.is_control_flow && props.has_fallthrough {
            Self::Branch
        } else {
            Self::Plain
        }
    }
}

/// How a branch actually resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchOutcome {
    pub taken: bool,
    pub target: u64,
    pub fallthrough: u64,
}

impl BranchOutcome {
    pub const fn new(taken: bool, target: u64, fallthrough: u64) -> Self {
        Self {
            taken,
            target,
            fallthrough,
        }
    }

    /// Where the branch really goes.
    pub const fn right_path(&self) -> u64 {
        if self.taken {
            self.target
        } else {
            self.fallthrough
        }
    }

    /// The direction the branch did not go.
    pub const fn wrong_path(&self) -> u64 {
        if self.taken {
            self.fallthrough
        } else {
            self.target
        }
    }
}
