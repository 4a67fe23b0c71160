//! RISC-V instruction set extensions.
//!
//! Each extension provides decode, classification, and disasm for its own
//! instructions. The base integer set is an extension like any other.

mod base;
mod m;

pub use base::{
    BaseExtension, OP_ADD, OP_ADDI, OP_ADDIW, OP_ADDW, OP_AND, OP_ANDI, OP_AUIPC, OP_BEQ, OP_BGE,
    OP_BGEU, OP_BLT, OP_BLTU, OP_BNE, OP_EBREAK, OP_ECALL, OP_FENCE, OP_JAL, OP_JALR, OP_LB,
    OP_LBU, OP_LD, OP_LH, OP_LHU, OP_LUI, OP_LW, OP_LWU, OP_OR, OP_ORI, OP_SB, OP_SD, OP_SH,
    OP_SLL, OP_SLLI, OP_SLLIW, OP_SLLW, OP_SLT, OP_SLTI, OP_SLTIU, OP_SLTU, OP_SRA, OP_SRAI,
    OP_SRAIW, OP_SRAW, OP_SRL, OP_SRLI, OP_SRLIW, OP_SRLW, OP_SUB, OP_SUBW, OP_SW, OP_XOR,
    OP_XORI,
};
pub use m::{
    MExtension, OP_DIV, OP_DIVU, OP_DIVUW, OP_DIVW, OP_MUL, OP_MULH, OP_MULHSU, OP_MULHU,
    OP_MULW, OP_REM, OP_REMU, OP_REMUW, OP_REMW,
};

use crate::{DecodedInstr, EXT_I, EXT_M, OpId, OpInfo};

/// Extension point for instruction decoding.
pub trait InstructionExtension: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extension ID of every op this extension produces.
    fn ext_id(&self) -> u8;

    /// Try to decode a 32-bit word at pc. Return None to fall through.
    fn decode32(&self, raw: u32, pc: u64) -> Option<DecodedInstr>;

    /// Disassembly string for debugging.
    fn disasm(&self, instr: &DecodedInstr) -> String;

    /// Static information for one of this extension's ops.
    fn op_info(&self, opid: OpId) -> Option<OpInfo>;
}

/// Look up the static information of any standard op.
pub fn op_info(opid: OpId) -> Option<OpInfo> {
    match opid.ext {
        EXT_I => InstructionExtension::op_info(&BaseExtension, opid),
        EXT_M => InstructionExtension::op_info(&MExtension, opid),
        _ => None,
    }
}

/// Composite decoder that chains multiple extensions.
///
/// Tries extensions in order until one handles the instruction.
pub struct CompositeDecoder {
    extensions: Vec<Box<dyn InstructionExtension>>,
}

impl CompositeDecoder {
    pub fn new(extensions: Vec<Box<dyn InstructionExtension>>) -> Self {
        Self { extensions }
    }

    /// RV64IM.
    pub fn standard() -> Self {
        Self::new(vec![Box::new(BaseExtension), Box::new(MExtension)])
    }

    pub fn with_extension(mut self, ext: impl InstructionExtension + 'static) -> Self {
        self.extensions.push(Box::new(ext));
        self
    }

    /// Decode the instruction at the start of `bytes`.
    ///
    /// Compressed encodings and truncated words decode to `None`.
    pub fn decode(&self, bytes: &[u8], pc: u64) -> Option<DecodedInstr> {
        let word: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        let raw = u32::from_le_bytes(word);
        if raw & 0x3 != 0x3 {
            return None;
        }
        self.extensions
            .iter()
            .find_map(|ext| ext.decode32(raw, pc))
    }

    pub fn disasm(&self, instr: &DecodedInstr) -> String {
        self.extensions
            .iter()
            .find(|ext| ext.ext_id() == instr.opid.ext)
            .map_or_else(|| format!("??? (ext={})", instr.opid.ext), |ext| ext.disasm(instr))
    }

    pub fn extension_names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }
}

impl Default for CompositeDecoder {
    fn default() -> Self {
        Self::standard()
    }
}
