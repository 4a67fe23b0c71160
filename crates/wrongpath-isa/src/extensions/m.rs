//! M extension (multiply/divide): decode, classification, disasm.

use super::InstructionExtension;
use crate::{
    DecodedInstr, EXT_M, INSN_BYTES, InstrArgs, OpClass, OpId, OpInfo, decode_funct3,
    decode_funct7, decode_opcode, decode_rd, decode_rs1, decode_rs2, reg_name,
};

pub const OP_MUL: OpId = OpId::new(EXT_M, 0);
pub const OP_MULH: OpId = OpId::new(EXT_M, 1);
pub const OP_MULHSU: OpId = OpId::new(EXT_M, 2);
pub const OP_MULHU: OpId = OpId::new(EXT_M, 3);
pub const OP_DIV: OpId = OpId::new(EXT_M, 4);
pub const OP_DIVU: OpId = OpId::new(EXT_M, 5);
pub const OP_REM: OpId = OpId::new(EXT_M, 6);
pub const OP_REMU: OpId = OpId::new(EXT_M, 7);

// RV64M W variants
pub const OP_MULW: OpId = OpId::new(EXT_M, 8);
pub const OP_DIVW: OpId = OpId::new(EXT_M, 9);
pub const OP_DIVUW: OpId = OpId::new(EXT_M, 10);
pub const OP_REMW: OpId = OpId::new(EXT_M, 11);
pub const OP_REMUW: OpId = OpId::new(EXT_M, 12);

const MNEMONICS: [&str; 13] = [
    "mul", "mulh", "mulhsu", "mulhu", "div", "divu", "rem", "remu", "mulw", "divw", "divuw",
    "remw", "remuw",
];

/// M extension (multiply/divide).
pub struct MExtension;

impl InstructionExtension for MExtension {
    fn name(&self) -> &'static str {
        "M"
    }

    fn ext_id(&self) -> u8 {
        EXT_M
    }

    fn decode32(&self, raw: u32, pc: u64) -> Option<DecodedInstr> {
        if decode_funct7(raw) != 0x01 {
            return None;
        }

        let opid = match (decode_opcode(raw), decode_funct3(raw)) {
            (0x33, 0) => OP_MUL,
            (0x33, 1) => OP_MULH,
            (0x33, 2) => OP_MULHSU,
            (0x33, 3) => OP_MULHU,
            (0x33, 4) => OP_DIV,
            (0x33, 5) => OP_DIVU,
            (0x33, 6) => OP_REM,
            (0x33, 7) => OP_REMU,
            (0x3B, 0) => OP_MULW,
            (0x3B, 4) => OP_DIVW,
            (0x3B, 5) => OP_DIVUW,
            (0x3B, 6) => OP_REMW,
            (0x3B, 7) => OP_REMUW,
            _ => return None,
        };

        let args = InstrArgs::R {
            rd: decode_rd(raw),
            rs1: decode_rs1(raw),
            rs2: decode_rs2(raw),
        };
        Some(DecodedInstr::new(opid, pc, INSN_BYTES, raw, args))
    }

    fn disasm(&self, instr: &DecodedInstr) -> String {
        let mnemonic = instr.mnemonic();
        match instr.args {
            InstrArgs::R { rd, rs1, rs2 } => format!(
                "{mnemonic} {}, {}, {}",
                reg_name(rd),
                reg_name(rs1),
                reg_name(rs2)
            ),
            _ => format!("{mnemonic} <?>"),
        }
    }

    fn op_info(&self, opid: OpId) -> Option<OpInfo> {
        if opid.ext != EXT_M {
            return None;
        }
        MNEMONICS
            .get(usize::from(opid.idx))
            .map(|name| OpInfo::new(opid, name, OpClass::Alu))
    }
}
