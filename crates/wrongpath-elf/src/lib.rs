//! ELF64 loader for little-endian RISC-V guest programs.

mod constants;
mod file;
mod header;
mod image;

pub use constants::*;
pub use file::*;
pub use header::*;
pub use image::*;

use thiserror::Error;

/// ELF parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElfError {
    #[error("ELF data too small")]
    TooSmall,
    #[error("Only little-endian ELF supported")]
    NotLittleEndian,
    #[error("ELF XLEN mismatch: expected {expected}, got {actual}")]
    XlenMismatch { expected: u8, actual: u8 },
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Not a RISC-V ELF (e_machine = {0})")]
    WrongMachine(u16),
    #[error("Section header out of bounds")]
    SectionOutOfBounds,
    #[error("Program header out of bounds")]
    ProgramOutOfBounds,
    #[error("Segment extends beyond file")]
    SegmentBeyondFile,
    #[error("Segment file size exceeds its memory size")]
    FileSizeExceedsMemSize,
    #[error("Virtual address overflow")]
    VirtualAddressOverflow,
    #[error("No loadable segments found")]
    NoLoadableSegments,
    #[error("Too many loadable segments")]
    TooManySegments,
    #[error("Overlapping virtual address ranges")]
    OverlappingSegments,
    #[error("Not an ELF file (use --raw for flat binaries)")]
    NotElf,
}

pub type Result<T> = std::result::Result<T, ElfError>;
