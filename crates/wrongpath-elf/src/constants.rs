//! ELF specification constants.

// ELF header constants
pub const ELF_MAGIC: u32 = 0x464C_457F; // 0x7F 'E' 'L' 'F'
pub const ELF_CLASS_32: u8 = 1;
pub const ELF_CLASS_64: u8 = 2;
pub const ELF_DATA_LSB: u8 = 1;
pub const ELF_VERSION_CURRENT: u8 = 1;
pub const ELF_TYPE_EXEC: u16 = 2;
pub const ELF_MACHINE_RISCV: u16 = 243;

pub const ELF64_EHDR_SIZE: usize = 64;
pub const ELF64_PHDR_SIZE: usize = 56;
pub const ELF64_SHDR_SIZE: usize = 64;
pub const ELF64_SYM_SIZE: usize = 24;

// Program header types
pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;

// Program header flags
pub const PF_X: u32 = 0x1; // Execute
pub const PF_W: u32 = 0x2; // Write
pub const PF_R: u32 = 0x4; // Read

// Section header types
pub const SHT_SYMTAB: u32 = 2;

// Symbol type (lower 4 bits of st_info)
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;

// RISC-V ELF e_flags (RISC-V ELF psABI)
pub const EF_RISCV_RVC: u32 = 0x1; // Uses C (compressed) extension
pub const EF_RISCV_RVE: u32 = 0x8; // Uses E (embedded, 16 registers) extension

// Limits
pub const MAX_SEGMENTS: usize = 8;
