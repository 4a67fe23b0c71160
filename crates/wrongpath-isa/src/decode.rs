//! Decoded instruction representation.

use crate::{OpClass, OpId, REG_ZERO, op_info};

/// Decoded instruction with all fields extracted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstr {
    /// Instruction identifier.
    pub opid: OpId,
    /// Program counter.
    pub pc: u64,
    /// Instruction size in bytes.
    pub size: u8,
    /// Raw instruction word.
    pub raw: u32,
    /// Instruction arguments.
    pub args: InstrArgs,
}

/// Instruction argument patterns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstrArgs {
    /// R-type: rd, rs1, rs2
    R { rd: u8, rs1: u8, rs2: u8 },
    /// I-type: rd, rs1, imm
    I { rd: u8, rs1: u8, imm: i32 },
    /// S-type: rs1, rs2, imm
    S { rs1: u8, rs2: u8, imm: i32 },
    /// B-type: rs1, rs2, imm
    B { rs1: u8, rs2: u8, imm: i32 },
    /// U-type: rd, imm
    U { rd: u8, imm: i32 },
    /// J-type: rd, imm
    J { rd: u8, imm: i32 },
    /// No arguments (ECALL, EBREAK, FENCE)
    None,
}

impl InstrArgs {
    /// Destination register, if the format has one.
    pub const fn rd(&self) -> Option<u8> {
        match self {
            Self::R { rd, .. } | Self::I { rd, .. } | Self::U { rd, .. } | Self::J { rd, .. } => {
                Some(*rd)
            }
            Self::S { .. } | Self::B { .. } | Self::None => None,
        }
    }
}

impl DecodedInstr {
    pub const fn new(opid: OpId, pc: u64, size: u8, raw: u32, args: InstrArgs) -> Self {
        Self {
            opid,
            pc,
            size,
            raw,
            args,
        }
    }

    /// Behaviour class from the owning extension's op table.
    pub fn class(&self) -> OpClass {
        op_info(self.opid).map_or(OpClass::System, |info| info.class)
    }

    pub fn mnemonic(&self) -> &'static str {
        op_info(self.opid).map_or("???", |info| info.name)
    }

    /// Address of the sequentially next instruction.
    pub const fn next_pc(&self) -> u64 {
        self.pc.wrapping_add(self.size as u64)
    }

    pub fn is_control_flow(&self) -> bool {
        self.class().is_control_flow()
    }

    /// Whether the instruction has a sequential alternative to its transfer.
    ///
    /// True for conditional branches and for calls (jumps that link), whose
    /// fallthrough is the return address.
    pub fn has_fallthrough(&self) -> bool {
        match self.class() {
            OpClass::Branch => true,
            OpClass::Jump => self.args.rd().is_some_and(|rd| rd != REG_ZERO),
            _ => false,
        }
    }

    /// Static target of a direct branch or jump.
    pub const fn direct_target(&self) -> Option<u64> {
        match self.args {
            InstrArgs::B { imm, .. } | InstrArgs::J { imm, .. } => {
                Some(self.pc.wrapping_add_signed(imm as i64))
            }
            _ => None,
        }
    }
}
