use crate::{InstrArgs, reg_name};

/// Render an instruction in assembler syntax; direct control transfers show
/// their absolute target.
pub(super) fn format_instr(mnemonic: &str, args: &InstrArgs, pc: u64) -> String {
    match *args {
        InstrArgs::R { rd, rs1, rs2 } => format!(
            "{mnemonic} {}, {}, {}",
            reg_name(rd),
            reg_name(rs1),
            reg_name(rs2)
        ),
        InstrArgs::I { rd, rs1, imm } if mnemonic.starts_with('l') || mnemonic == "jalr" => {
            format!("{mnemonic} {}, {imm}({})", reg_name(rd), reg_name(rs1))
        }
        InstrArgs::I { rd, rs1, imm } => {
            format!("{mnemonic} {}, {}, {imm}", reg_name(rd), reg_name(rs1))
        }
        InstrArgs::S { rs1, rs2, imm } => {
            format!("{mnemonic} {}, {imm}({})", reg_name(rs2), reg_name(rs1))
        }
        InstrArgs::B { rs1, rs2, imm } => format!(
            "{mnemonic} {}, {}, {:#x}",
            reg_name(rs1),
            reg_name(rs2),
            pc.wrapping_add_signed(i64::from(imm))
        ),
        InstrArgs::U { rd, imm } => {
            format!("{mnemonic} {}, {:#x}", reg_name(rd), imm.cast_unsigned() >> 12)
        }
        InstrArgs::J { rd, imm } => format!(
            "{mnemonic} {}, {:#x}",
            reg_name(rd),
            pc.wrapping_add_signed(i64::from(imm))
        ),
        InstrArgs::None => mnemonic.to_string(),
    }
}
