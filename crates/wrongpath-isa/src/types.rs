//! Core types for the RV64IM ISA.

use std::fmt::Display;

/// Compact instruction identifier (2 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct OpId {
    /// Extension (`EXT_I`, `EXT_M`)
    pub ext: u8,
    /// Index within extension
    pub idx: u8,
}

impl OpId {
    pub const fn new(ext: u8, idx: u8) -> Self {
        Self { ext, idx }
    }
}

impl Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpId({}, {})", self.ext, self.idx)
    }
}

// Extension constants
pub const EXT_I: u8 = 0;
pub const EXT_M: u8 = 1;

pub const NUM_REGS: usize = 32;

/// Bytes in every instruction this decoder accepts.
pub const INSN_BYTES: u8 = 4;

// Register ABI names
pub const REG_ZERO: u8 = 0;
pub const REG_RA: u8 = 1;
pub const REG_SP: u8 = 2;
pub const REG_GP: u8 = 3;
pub const REG_TP: u8 = 4;
pub const REG_T0: u8 = 5;
pub const REG_T1: u8 = 6;
pub const REG_T2: u8 = 7;
pub const REG_S0: u8 = 8;
pub const REG_S1: u8 = 9;
pub const REG_A0: u8 = 10;
pub const REG_A1: u8 = 11;
pub const REG_A2: u8 = 12;
pub const REG_A3: u8 = 13;
pub const REG_A4: u8 = 14;
pub const REG_A5: u8 = 15;
pub const REG_A6: u8 = 16;
pub const REG_A7: u8 = 17;

const ABI_NAMES: [&str; NUM_REGS] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Get register ABI name.
pub fn reg_name(reg: u8) -> &'static str {
    ABI_NAMES.get(usize::from(reg)).copied().unwrap_or("??")
}

/// Coarse behaviour class of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpClass {
    Alu,
    Load,
    Store,
    /// Conditional branch.
    Branch,
    /// Unconditional jump, direct or indirect.
    Jump,
    /// Environment call or breakpoint.
    System,
    Fence,
}

impl OpClass {
    /// Whether the operation can redirect the instruction stream.
    pub const fn is_control_flow(self) -> bool {
        matches!(self, Self::Branch | Self::Jump)
    }
}

/// Static description of one operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    pub opid: OpId,
    pub name: &'static str,
    pub class: OpClass,
}

impl OpInfo {
    pub const fn new(opid: OpId, name: &'static str, class: OpClass) -> Self {
        Self { opid, name, class }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opid() {
        let op = OpId::new(EXT_I, 5);
        assert_eq!(op.ext, EXT_I);
        assert_eq!(op.idx, 5);
    }

    #[test]
    fn test_reg_names() {
        assert_eq!(reg_name(REG_ZERO), "zero");
        assert_eq!(reg_name(REG_SP), "sp");
        assert_eq!(reg_name(REG_A7), "a7");
        assert_eq!(reg_name(31), "t6");
        assert_eq!(reg_name(32), "??");
    }

    #[test]
    fn test_control_flow_classes() {
        assert!(OpClass::Branch.is_control_flow());
        assert!(OpClass::Jump.is_control_flow());
        assert!(!OpClass::System.is_control_flow());
        assert!(!OpClass::Store.is_control_flow());
    }
}
