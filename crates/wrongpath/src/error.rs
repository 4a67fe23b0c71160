use thiserror::Error;

/// Monitor errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("ELF error: {0}")]
    Elf(#[from] wrongpath_elf::ElfError),
    #[error("Memory error: {0}")]
    Memory(#[from] wrongpath_state::MemoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XLEN mismatch: expected {expected}, got {actual}")]
    XlenMismatch { expected: u8, actual: u8 },
    #[error("Illegal instruction 0x{raw:08x} at 0x{pc:x}")]
    IllegalInstruction { pc: u64, raw: u32 },
    #[error("Misaligned instruction fetch at 0x{0:x}")]
    MisalignedFetch(u64),
    #[error("Breakpoint at 0x{0:x}")]
    Breakpoint(u64),
    #[error("Trace output failed: {0}")]
    Trace(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
