//! Instruction encoders.
//!
//! The inverse of the field helpers in `encode`, used to assemble small guest
//! programs in tests and tooling.

const fn r_type(opcode: u32, funct3: u32, funct7: u32, rd: u8, rs1: u8, rs2: u8) -> u32 {
    (funct7 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | opcode
}

const fn i_type(opcode: u32, funct3: u32, rd: u8, rs1: u8, imm: i32) -> u32 {
    ((imm.cast_unsigned() & 0xFFF) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((rd as u32) << 7)
        | opcode
}

const fn s_type(opcode: u32, funct3: u32, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm.cast_unsigned();
    (((imm >> 5) & 0x7F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | ((imm & 0x1F) << 7)
        | opcode
}

const fn b_type(funct3: u32, rs1: u8, rs2: u8, offset: i32) -> u32 {
    let imm = offset.cast_unsigned();
    (((imm >> 12) & 0x1) << 31)
        | (((imm >> 5) & 0x3F) << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (funct3 << 12)
        | (((imm >> 1) & 0xF) << 8)
        | (((imm >> 11) & 0x1) << 7)
        | 0x63
}

const fn u_type(opcode: u32, rd: u8, imm20: u32) -> u32 {
    ((imm20 & 0xF_FFFF) << 12) | ((rd as u32) << 7) | opcode
}

pub const fn jal(rd: u8, offset: i32) -> u32 {
    let imm = offset.cast_unsigned();
    (((imm >> 20) & 0x1) << 31)
        | (((imm >> 1) & 0x3FF) << 21)
        | (((imm >> 11) & 0x1) << 20)
        | (((imm >> 12) & 0xFF) << 12)
        | ((rd as u32) << 7)
        | 0x6F
}

pub const fn jalr(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x67, 0, rd, rs1, imm)
}

pub const fn beq(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(0, rs1, rs2, offset)
}

pub const fn bne(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(1, rs1, rs2, offset)
}

pub const fn blt(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(4, rs1, rs2, offset)
}

pub const fn bge(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(5, rs1, rs2, offset)
}

pub const fn bltu(rs1: u8, rs2: u8, offset: i32) -> u32 {
    b_type(6, rs1, rs2, offset)
}

pub const fn lui(rd: u8, imm20: u32) -> u32 {
    u_type(0x37, rd, imm20)
}

pub const fn auipc(rd: u8, imm20: u32) -> u32 {
    u_type(0x17, rd, imm20)
}

pub const fn addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x13, 0, rd, rs1, imm)
}

pub const fn andi(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x13, 7, rd, rs1, imm)
}

pub const fn slli(rd: u8, rs1: u8, shamt: u8) -> u32 {
    i_type(0x13, 1, rd, rs1, (shamt & 0x3F) as i32)
}

pub const fn addiw(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x1B, 0, rd, rs1, imm)
}

pub const fn add(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, 0, 0x00, rd, rs1, rs2)
}

pub const fn sub(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, 0, 0x20, rd, rs1, rs2)
}

pub const fn mul(rd: u8, rs1: u8, rs2: u8) -> u32 {
    r_type(0x33, 0, 0x01, rd, rs1, rs2)
}

pub const fn ld(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x03, 3, rd, rs1, imm)
}

pub const fn lw(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x03, 2, rd, rs1, imm)
}

pub const fn lbu(rd: u8, rs1: u8, imm: i32) -> u32 {
    i_type(0x03, 4, rd, rs1, imm)
}

pub const fn sd(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x23, 3, rs1, rs2, imm)
}

pub const fn sw(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x23, 2, rs1, rs2, imm)
}

pub const fn sb(rs1: u8, rs2: u8, imm: i32) -> u32 {
    s_type(0x23, 0, rs1, rs2, imm)
}

pub const fn ecall() -> u32 {
    0x0000_0073
}

pub const fn ebreak() -> u32 {
    0x0010_0073
}

pub const fn nop() -> u32 {
    addi(0, 0, 0)
}

/// Little-endian byte image of a sequence of instruction words.
pub fn assemble(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}
