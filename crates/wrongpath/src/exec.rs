//! RV64IM instruction semantics over the guest context and memory.
//!
//! Control transfers that the monitor speculates are split in two: the
//! outcome is resolved from the pre-instruction state by
//! [`branch_outcome`], and a call's link register is written separately by
//! [`write_link`] so it lands in the checkpoint.

use wrongpath_engine::BranchOutcome;
use wrongpath_isa::*;
use wrongpath_state::{CpuContext, GuestMemory};

/// What the host still has to do after [`execute`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Fully executed, `pc` already advanced.
    Done,
    /// Environment call; `pc` still points at the instruction.
    Ecall,
    /// Breakpoint; `pc` still points at the instruction.
    Ebreak,
    /// Decoded but without semantics here.
    Illegal,
}

#[inline]
const fn sext32(value: u64) -> u64 {
    (value as u32).cast_signed() as i64 as u64
}

#[inline]
const fn imm64(imm: i32) -> u64 {
    (imm as i64).cast_unsigned()
}

/// Resolve a conditional branch or a call without applying it.
///
/// Returns `None` for anything that has no sequential alternative.
pub fn branch_outcome(ctx: &CpuContext, instr: &DecodedInstr) -> Option<BranchOutcome> {
    let fallthrough = instr.next_pc();
    match instr.args {
        InstrArgs::B { rs1, rs2, .. } => {
            let a = ctx.get_reg(rs1);
            let b = ctx.get_reg(rs2);
            let taken = match instr.opid {
                OP_BEQ => a == b,
                OP_BNE => a != b,
                OP_BLT => a.cast_signed() < b.cast_signed(),
                OP_BGE => a.cast_signed() >= b.cast_signed(),
                OP_BLTU => a < b,
                OP_BGEU => a >= b,
                _ => return None,
            };
            Some(BranchOutcome::new(taken, instr.direct_target()?, fallthrough))
        }
        InstrArgs::J { rd, .. } if rd != REG_ZERO => Some(BranchOutcome::new(
            true,
            instr.direct_target()?,
            fallthrough,
        )),
        InstrArgs::I { rd, rs1, imm } if instr.opid == OP_JALR && rd != REG_ZERO => {
            let target = ctx.get_reg(rs1).wrapping_add(imm64(imm)) & !1;
            Some(BranchOutcome::new(true, target, fallthrough))
        }
        _ => None,
    }
}

/// Write the return address of a linking jump. No-op for anything else.
pub fn write_link(ctx: &mut CpuContext, instr: &DecodedInstr) {
    if (instr.opid == OP_JAL || instr.opid == OP_JALR)
        && let Some(rd) = instr.args.rd()
    {
        ctx.set_reg(rd, instr.next_pc());
    }
}

/// Execute one instruction.
pub fn execute(ctx: &mut CpuContext, mem: &mut GuestMemory, instr: &DecodedInstr) -> Effect {
    let next = instr.next_pc();
    let pc = instr.pc;

    match instr.opid {
        OP_ECALL => return Effect::Ecall,
        OP_EBREAK => return Effect::Ebreak,
        OP_FENCE => {}

        OP_LUI => exec_u(ctx, &instr.args, |imm| imm64(imm)),
        OP_AUIPC => exec_u(ctx, &instr.args, |imm| pc.wrapping_add(imm64(imm))),

        OP_JAL | OP_JALR => {
            // Target before link: rd may alias rs1.
            let target = match instr.args {
                InstrArgs::J { imm, .. } => pc.wrapping_add(imm64(imm)),
                InstrArgs::I { rs1, imm, .. } => ctx.get_reg(rs1).wrapping_add(imm64(imm)) & !1,
                _ => next,
            };
            write_link(ctx, instr);
            ctx.pc = target;
            return Effect::Done;
        }
        OP_BEQ | OP_BNE | OP_BLT | OP_BGE | OP_BLTU | OP_BGEU => {
            ctx.pc = branch_outcome(ctx, instr).map_or(next, |o| o.right_path());
            return Effect::Done;
        }

        OP_LB => exec_load(ctx, mem, &instr.args, |m, a| m.read_u8(a) as i8 as u64),
        OP_LH => exec_load(ctx, mem, &instr.args, |m, a| m.read_u16(a) as i16 as u64),
        OP_LW => exec_load(ctx, mem, &instr.args, |m, a| m.read_u32(a) as i32 as u64),
        OP_LD => exec_load(ctx, mem, &instr.args, GuestMemory::read_u64),
        OP_LBU => exec_load(ctx, mem, &instr.args, |m, a| u64::from(m.read_u8(a))),
        OP_LHU => exec_load(ctx, mem, &instr.args, |m, a| u64::from(m.read_u16(a))),
        OP_LWU => exec_load(ctx, mem, &instr.args, |m, a| u64::from(m.read_u32(a))),

        OP_SB => exec_store(ctx, mem, &instr.args, |m, a, v| m.write_u8(a, v as u8)),
        OP_SH => exec_store(ctx, mem, &instr.args, |m, a, v| m.write_u16(a, v as u16)),
        OP_SW => exec_store(ctx, mem, &instr.args, |m, a, v| m.write_u32(a, v as u32)),
        OP_SD => exec_store(ctx, mem, &instr.args, GuestMemory::write_u64),

        OP_ADDI => exec_i(ctx, &instr.args, |a, i| a.wrapping_add(i)),
        OP_SLTI => exec_i(ctx, &instr.args, |a, i| {
            u64::from(a.cast_signed() < i.cast_signed())
        }),
        OP_SLTIU => exec_i(ctx, &instr.args, |a, i| u64::from(a < i)),
        OP_XORI => exec_i(ctx, &instr.args, |a, i| a ^ i),
        OP_ORI => exec_i(ctx, &instr.args, |a, i| a | i),
        OP_ANDI => exec_i(ctx, &instr.args, |a, i| a & i),
        OP_SLLI => exec_i(ctx, &instr.args, |a, i| a << (i & 0x3F)),
        OP_SRLI => exec_i(ctx, &instr.args, |a, i| a >> (i & 0x3F)),
        OP_SRAI => exec_i(ctx, &instr.args, |a, i| {
            (a.cast_signed() >> (i & 0x3F)).cast_unsigned()
        }),
        OP_ADDIW => exec_i(ctx, &instr.args, |a, i| sext32(a.wrapping_add(i))),
        OP_SLLIW => exec_i(ctx, &instr.args, |a, i| sext32(a << (i & 0x1F))),
        OP_SRLIW => exec_i(ctx, &instr.args, |a, i| {
            sext32(u64::from((a as u32) >> (i & 0x1F)))
        }),
        OP_SRAIW => exec_i(ctx, &instr.args, |a, i| {
            ((a as u32).cast_signed() >> (i & 0x1F)) as i64 as u64
        }),

        OP_ADD => exec_r(ctx, &instr.args, u64::wrapping_add),
        OP_SUB => exec_r(ctx, &instr.args, u64::wrapping_sub),
        OP_SLL => exec_r(ctx, &instr.args, |a, b| a << (b & 0x3F)),
        OP_SLT => exec_r(ctx, &instr.args, |a, b| {
            u64::from(a.cast_signed() < b.cast_signed())
        }),
        OP_SLTU => exec_r(ctx, &instr.args, |a, b| u64::from(a < b)),
        OP_XOR => exec_r(ctx, &instr.args, |a, b| a ^ b),
        OP_SRL => exec_r(ctx, &instr.args, |a, b| a >> (b & 0x3F)),
        OP_SRA => exec_r(ctx, &instr.args, |a, b| {
            (a.cast_signed() >> (b & 0x3F)).cast_unsigned()
        }),
        OP_OR => exec_r(ctx, &instr.args, |a, b| a | b),
        OP_AND => exec_r(ctx, &instr.args, |a, b| a & b),
        OP_ADDW => exec_r(ctx, &instr.args, |a, b| sext32(a.wrapping_add(b))),
        OP_SUBW => exec_r(ctx, &instr.args, |a, b| sext32(a.wrapping_sub(b))),
        OP_SLLW => exec_r(ctx, &instr.args, |a, b| sext32(a << (b & 0x1F))),
        OP_SRLW => exec_r(ctx, &instr.args, |a, b| {
            sext32(u64::from((a as u32) >> (b & 0x1F)))
        }),
        OP_SRAW => exec_r(ctx, &instr.args, |a, b| {
            ((a as u32).cast_signed() >> (b & 0x1F)) as i64 as u64
        }),

        OP_MUL => exec_r(ctx, &instr.args, u64::wrapping_mul),
        OP_MULH => exec_r(ctx, &instr.args, mulh),
        OP_MULHSU => exec_r(ctx, &instr.args, mulhsu),
        OP_MULHU => exec_r(ctx, &instr.args, mulhu),
        OP_DIV => exec_r(ctx, &instr.args, div),
        OP_DIVU => exec_r(ctx, &instr.args, |a, b| a.checked_div(b).unwrap_or(u64::MAX)),
        OP_REM => exec_r(ctx, &instr.args, rem),
        OP_REMU => exec_r(ctx, &instr.args, |a, b| a.checked_rem(b).unwrap_or(a)),
        OP_MULW => exec_r(ctx, &instr.args, |a, b| sext32(a.wrapping_mul(b))),
        OP_DIVW => exec_r(ctx, &instr.args, |a, b| sext32(div(sext32(a), sext32(b)))),
        OP_DIVUW => exec_r(ctx, &instr.args, |a, b| {
            let (a, b) = (a as u32, b as u32);
            sext32(u64::from(a.checked_div(b).unwrap_or(u32::MAX)))
        }),
        OP_REMW => exec_r(ctx, &instr.args, |a, b| sext32(rem(sext32(a), sext32(b)))),
        OP_REMUW => exec_r(ctx, &instr.args, |a, b| {
            let (a, b) = (a as u32, b as u32);
            sext32(u64::from(a.checked_rem(b).unwrap_or(a)))
        }),

        _ => return Effect::Illegal,
    }

    ctx.pc = next;
    Effect::Done
}

fn exec_u(ctx: &mut CpuContext, args: &InstrArgs, op: impl FnOnce(i32) -> u64) {
    if let InstrArgs::U { rd, imm } = *args {
        ctx.set_reg(rd, op(imm));
    }
}

fn exec_i(ctx: &mut CpuContext, args: &InstrArgs, op: impl FnOnce(u64, u64) -> u64) {
    if let InstrArgs::I { rd, rs1, imm } = *args {
        ctx.set_reg(rd, op(ctx.get_reg(rs1), imm64(imm)));
    }
}

fn exec_r(ctx: &mut CpuContext, args: &InstrArgs, op: impl FnOnce(u64, u64) -> u64) {
    if let InstrArgs::R { rd, rs1, rs2 } = *args {
        ctx.set_reg(rd, op(ctx.get_reg(rs1), ctx.get_reg(rs2)));
    }
}

fn exec_load(
    ctx: &mut CpuContext,
    mem: &GuestMemory,
    args: &InstrArgs,
    load: impl FnOnce(&GuestMemory, u64) -> u64,
) {
    if let InstrArgs::I { rd, rs1, imm } = *args {
        let addr = ctx.get_reg(rs1).wrapping_add(imm64(imm));
        ctx.set_reg(rd, load(mem, addr));
    }
}

fn exec_store(
    ctx: &CpuContext,
    mem: &mut GuestMemory,
    args: &InstrArgs,
    store: impl FnOnce(&mut GuestMemory, u64, u64),
) {
    if let InstrArgs::S { rs1, rs2, imm } = *args {
        let addr = ctx.get_reg(rs1).wrapping_add(imm64(imm));
        store(mem, addr, ctx.get_reg(rs2));
    }
}

fn mulh(a: u64, b: u64) -> u64 {
    ((i128::from(a.cast_signed()) * i128::from(b.cast_signed())) >> 64) as u64
}

fn mulhsu(a: u64, b: u64) -> u64 {
    ((i128::from(a.cast_signed()) * i128::from(b)) >> 64) as u64
}

fn mulhu(a: u64, b: u64) -> u64 {
    ((u128::from(a) * u128::from(b)) >> 64) as u64
}

/// Signed division: x/0 is -1, overflow yields the dividend.
fn div(a: u64, b: u64) -> u64 {
    let (a, b) = (a.cast_signed(), b.cast_signed());
    if b == 0 {
        u64::MAX
    } else {
        a.wrapping_div(b).cast_unsigned()
    }
}

/// Signed remainder: x%0 is x, overflow yields 0.
fn rem(a: u64, b: u64) -> u64 {
    let (a, b) = (a.cast_signed(), b.cast_signed());
    if b == 0 {
        a.cast_unsigned()
    } else {
        a.wrapping_rem(b).cast_unsigned()
    }
}
