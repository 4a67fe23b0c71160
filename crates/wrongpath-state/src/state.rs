//! RV64 register context.

use wrongpath_engine::ExecutionContext;
use wrongpath_isa::{NUM_REGS, REG_ZERO, reg_name};

/// General-purpose registers and program counter of one hart.
///
/// This is everything a checkpoint captures. Memory is not part of it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CpuContext {
    regs: [u64; NUM_REGS],
    pub pc: u64,
}

impl CpuContext {
    pub const fn new(pc: u64) -> Self {
        Self {
            regs: [0; NUM_REGS],
            pc,
        }
    }

    /// Read a register; `x0` always reads zero.
    #[inline]
    pub fn get_reg(&self, reg: u8) -> u64 {
        self.regs.get(usize::from(reg)).copied().unwrap_or(0)
    }

    /// Write a register; writes to `x0` are discarded.
    #[inline]
    pub fn set_reg(&mut self, reg: u8, value: u64) {
        if reg == REG_ZERO {
            return;
        }
        if let Some(slot) = self.regs.get_mut(usize::from(reg)) {
            *slot = value;
        }
    }

    pub const fn regs(&self) -> &[u64; NUM_REGS] {
        &self.regs
    }
}

impl Default for CpuContext {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ExecutionContext for CpuContext {
    fn instruction_pointer(&self) -> u64 {
        self.pc
    }

    fn set_instruction_pointer(&mut self, addr: u64) {
        self.pc = addr;
    }
}

impl std::fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        map.entry(&"pc", &format_args!("{:#x}", self.pc));
        for (idx, value) in self.regs.iter().enumerate().skip(1) {
            if *value != 0 {
                let name = u8::try_from(idx).map_or("??", reg_name);
                map.entry(&name, &format_args!("{value:#x}"));
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrongpath_isa::{REG_A0, REG_SP};

    #[test]
    fn test_x0_is_hardwired() {
        let mut ctx = CpuContext::new(0x1000);
        ctx.set_reg(REG_ZERO, 42);
        assert_eq!(ctx.get_reg(REG_ZERO), 0);
        ctx.set_reg(REG_A0, 42);
        assert_eq!(ctx.get_reg(REG_A0), 42);
    }

    #[test]
    fn test_out_of_range_registers() {
        let mut ctx = CpuContext::default();
        ctx.set_reg(40, 1);
        assert_eq!(ctx.get_reg(40), 0);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut live = CpuContext::new(0x100);
        live.set_reg(REG_SP, 0x8000);
        let snapshot = live;
        live.set_reg(REG_SP, 0);
        live.set_instruction_pointer(0x200);
        assert_eq!(snapshot.get_reg(REG_SP), 0x8000);
        assert_eq!(snapshot.instruction_pointer(), 0x100);
    }

    #[test]
    fn test_debug_lists_nonzero_registers() {
        let mut ctx = CpuContext::new(0x10);
        ctx.set_reg(REG_A0, 7);
        assert_eq!(format!("{ctx:?}"), r#"{"pc": 0x10, "a0": 0x7}"#);
    }
}
