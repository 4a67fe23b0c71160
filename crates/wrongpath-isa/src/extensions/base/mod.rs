//! Base integer set (RV64I): decode, classification, disasm.

use super::InstructionExtension;
use crate::{DecodedInstr, EXT_I, OpClass, OpId, OpInfo};

mod decode;
mod disasm;

use decode::decode_32bit;
use disasm::format_instr;

// ===== OpId Constants =====

pub const OP_LUI: OpId = OpId::new(EXT_I, 0);
pub const OP_AUIPC: OpId = OpId::new(EXT_I, 1);
pub const OP_JAL: OpId = OpId::new(EXT_I, 2);
pub const OP_JALR: OpId = OpId::new(EXT_I, 3);
pub const OP_BEQ: OpId = OpId::new(EXT_I, 4);
pub const OP_BNE: OpId = OpId::new(EXT_I, 5);
pub const OP_BLT: OpId = OpId::new(EXT_I, 6);
pub const OP_BGE: OpId = OpId::new(EXT_I, 7);
pub const OP_BLTU: OpId = OpId::new(EXT_I, 8);
pub const OP_BGEU: OpId = OpId::new(EXT_I, 9);
pub const OP_LB: OpId = OpId::new(EXT_I, 10);
pub const OP_LH: OpId = OpId::new(EXT_I, 11);
pub const OP_LW: OpId = OpId::new(EXT_I, 12);
pub const OP_LBU: OpId = OpId::new(EXT_I, 13);
pub const OP_LHU: OpId = OpId::new(EXT_I, 14);
pub const OP_SB: OpId = OpId::new(EXT_I, 15);
pub const OP_SH: OpId = OpId::new(EXT_I, 16);
pub const OP_SW: OpId = OpId::new(EXT_I, 17);
pub const OP_ADDI: OpId = OpId::new(EXT_I, 18);
pub const OP_SLTI: OpId = OpId::new(EXT_I, 19);
pub const OP_SLTIU: OpId = OpId::new(EXT_I, 20);
pub const OP_XORI: OpId = OpId::new(EXT_I, 21);
pub const OP_ORI: OpId = OpId::new(EXT_I, 22);
pub const OP_ANDI: OpId = OpId::new(EXT_I, 23);
pub const OP_SLLI: OpId = OpId::new(EXT_I, 24);
pub const OP_SRLI: OpId = OpId::new(EXT_I, 25);
pub const OP_SRAI: OpId = OpId::new(EXT_I, 26);
pub const OP_ADD: OpId = OpId::new(EXT_I, 27);
pub const OP_SUB: OpId = OpId::new(EXT_I, 28);
pub const OP_SLL: OpId = OpId::new(EXT_I, 29);
pub const OP_SLT: OpId = OpId::new(EXT_I, 30);
pub const OP_SLTU: OpId = OpId::new(EXT_I, 31);
pub const OP_XOR: OpId = OpId::new(EXT_I, 32);
pub const OP_SRL: OpId = OpId::new(EXT_I, 33);
pub const OP_SRA: OpId = OpId::new(EXT_I, 34);
pub const OP_OR: OpId = OpId::new(EXT_I, 35);
pub const OP_AND: OpId = OpId::new(EXT_I, 36);
pub const OP_FENCE: OpId = OpId::new(EXT_I, 37);
pub const OP_ECALL: OpId = OpId::new(EXT_I, 38);
pub const OP_EBREAK: OpId = OpId::new(EXT_I, 39);
// RV64I
pub const OP_LWU: OpId = OpId::new(EXT_I, 40);
pub const OP_LD: OpId = OpId::new(EXT_I, 41);
pub const OP_SD: OpId = OpId::new(EXT_I, 42);
pub const OP_ADDIW: OpId = OpId::new(EXT_I, 43);
pub const OP_SLLIW: OpId = OpId::new(EXT_I, 44);
pub const OP_SRLIW: OpId = OpId::new(EXT_I, 45);
pub const OP_SRAIW: OpId = OpId::new(EXT_I, 46);
pub const OP_ADDW: OpId = OpId::new(EXT_I, 47);
pub const OP_SUBW: OpId = OpId::new(EXT_I, 48);
pub const OP_SLLW: OpId = OpId::new(EXT_I, 49);
pub const OP_SRLW: OpId = OpId::new(EXT_I, 50);
pub const OP_SRAW: OpId = OpId::new(EXT_I, 51);

/// Op table, indexed by `OpId::idx`.
const OP_INFO_I: [OpInfo; 52] = {
    use OpClass::{Alu, Branch, Fence, Jump, Load, Store, System};
    [
        OpInfo::new(OP_LUI, "lui", Alu),
        OpInfo::new(OP_AUIPC, "auipc", Alu),
        OpInfo::new(OP_JAL, "jal", Jump),
        OpInfo::new(OP_JALR, "jalr", Jump),
        OpInfo::new(OP_BEQ, "beq", Branch),
        OpInfo::new(OP_BNE, "bne", Branch),
        OpInfo::new(OP_BLT, "blt", Branch),
        OpInfo::new(OP_BGE, "bge", Branch),
        OpInfo::new(OP_BLTU, "bltu", Branch),
        OpInfo::new(OP_BGEU, "bgeu", Branch),
        OpInfo::new(OP_LB, "lb", Load),
        OpInfo::new(OP_LH, "lh", Load),
        OpInfo::new(OP_LW, "lw", Load),
        OpInfo::new(OP_LBU, "lbu", Load),
        OpInfo::new(OP_LHU, "lhu", Load),
        OpInfo::new(OP_SB, "sb", Store),
        OpInfo::new(OP_SH, "sh", Store),
        OpInfo::new(OP_SW, "sw", Store),
        OpInfo::new(OP_ADDI, "addi", Alu),
        OpInfo::new(OP_SLTI, "slti", Alu),
        OpInfo::new(OP_SLTIU, "sltiu", Alu),
        OpInfo::new(OP_XORI, "xori", Alu),
        OpInfo::new(OP_ORI, "ori", Alu),
        OpInfo::new(OP_ANDI, "andi", Alu),
        OpInfo::new(OP_SLLI, "slli", Alu),
        OpInfo::new(OP_SRLI, "srli", Alu),
        OpInfo::new(OP_SRAI, "srai", Alu),
        OpInfo::new(OP_ADD, "add", Alu),
        OpInfo::new(OP_SUB, "sub", Alu),
        OpInfo::new(OP_SLL, "sll", Alu),
        OpInfo::new(OP_SLT, "slt", Alu),
        OpInfo::new(OP_SLTU, "sltu", Alu),
        OpInfo::new(OP_XOR, "xor", Alu),
        OpInfo::new(OP_SRL, "srl", Alu),
        OpInfo::new(OP_SRA, "sra", Alu),
        OpInfo::new(OP_OR, "or", Alu),
        OpInfo::new(OP_AND, "and", Alu),
        OpInfo::new(OP_FENCE, "fence", Fence),
        OpInfo::new(OP_ECALL, "ecall", System),
        OpInfo::new(OP_EBREAK, "ebreak", System),
        OpInfo::new(OP_LWU, "lwu", Load),
        OpInfo::new(OP_LD, "ld", Load),
        OpInfo::new(OP_SD, "sd", Store),
        OpInfo::new(OP_ADDIW, "addiw", Alu),
        OpInfo::new(OP_SLLIW, "slliw", Alu),
        OpInfo::new(OP_SRLIW, "srliw", Alu),
        OpInfo::new(OP_SRAIW, "sraiw", Alu),
        OpInfo::new(OP_ADDW, "addw", Alu),
        OpInfo::new(OP_SUBW, "subw", Alu),
        OpInfo::new(OP_SLLW, "sllw", Alu),
        OpInfo::new(OP_SRLW, "srlw", Alu),
        OpInfo::new(OP_SRAW, "sraw", Alu),
    ]
};

/// Base integer extension (RV64I).
pub struct BaseExtension;

impl InstructionExtension for BaseExtension {
    fn name(&self) -> &'static str {
        "I"
    }

    fn ext_id(&self) -> u8 {
        EXT_I
    }

    fn decode32(&self, raw: u32, pc: u64) -> Option<DecodedInstr> {
        decode_32bit(raw, pc)
    }

    fn disasm(&self, instr: &DecodedInstr) -> String {
        format_instr(instr.mnemonic(), &instr.args, instr.pc)
    }

    fn op_info(&self, opid: OpId) -> Option<OpInfo> {
        if opid.ext != EXT_I {
            return None;
        }
        OP_INFO_I.get(usize::from(opid.idx)).copied()
    }
}
