//! Wrong-path state tracking.

use crate::ResolutionThreshold;

/// Whether execution is on the wrong path, and for how long.
///
/// The count is only ever non-zero while `on_wrong_path` is set. It restarts
/// at zero on every entry into and exit from the wrong path, and every
/// observed on-path instruction clears it again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PathState {
    on_wrong_path: bool,
    wrong_path_instr_count: u32,
}

impl PathState {
    pub const fn new() -> Self {
        Self {
            on_wrong_path: false,
            wrong_path_instr_count: 0,
        }
    }

    pub const fn on_wrong_path(&self) -> bool {
        self.on_wrong_path
    }

    /// Instructions reached since the current excursion began.
    pub const fn wrong_path_instr_count(&self) -> u32 {
        self.wrong_path_instr_count
    }

    /// Account for one instruction about to execute.
    pub const fn observe(&mut self) {
        if self.on_wrong_path {
            self.wrong_path_instr_count = self.wrong_path_instr_count.saturating_add(1);
        } else {
            self.wrong_path_instr_count = 0;
        }
    }

    /// True once the excursion has run past its resolution window.
    pub const fn exceeds(&self, threshold: ResolutionThreshold) -> bool {
        self.on_wrong_path && self.wrong_path_instr_count > threshold.get()
    }

    /// Start a fresh excursion (also used when one is already running).
    pub const fn enter_wrong_path(&mut self) {
        self.wrong_path_instr_count = 0;
        self.on_wrong_path = true;
    }

    pub const fn leave_wrong_path(&mut self) {
        self.wrong_path_instr_count = 0;
        self.on_wrong_path = false;
    }
}
