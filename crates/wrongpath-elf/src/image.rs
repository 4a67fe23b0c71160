//! ELF image with memory segments.

use crate::constants::*;
use crate::file::ElfFile;
use crate::header::{ProgramHeader, Symbol};
use crate::{ElfError, Result};

/// A memory segment with virtual address and data.
///
/// `data` holds only the file bytes (filesz). Bytes from `data.len()` up to
/// `virtual_end - virtual_start` (memsz) are BSS and load as zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemorySegment {
    pub virtual_start: u64,
    pub virtual_end: u64,
    pub data: Vec<u8>,
    pub flags: u32,
}

impl MemorySegment {
    /// Size of file data (non-BSS).
    pub fn filesz(&self) -> u64 {
        self.data.len() as u64
    }

    /// Total memory size including BSS.
    pub const fn memsz(&self) -> u64 {
        self.virtual_end - self.virtual_start
    }

    pub fn bss_size(&self) -> u64 {
        self.memsz() - self.filesz()
    }

    pub const fn is_executable(&self) -> bool {
        (self.flags & PF_X) != 0
    }

    pub const fn contains(&self, addr: u64) -> bool {
        addr >= self.virtual_start && addr < self.virtual_end
    }
}

/// ELF image ready for loading into guest memory.
#[derive(Clone, Debug)]
pub struct ElfImage {
    pub entry_point: u64,
    pub e_flags: u32,
    pub memory_segments: Vec<MemorySegment>,
    pub symbols: Vec<Symbol>,
}

impl ElfImage {
    /// Parse ELF from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let elf = ElfFile::parse(data)?;
        let loadable = Self::validate_segments(&elf, data)?;
        let memory_segments = Self::load_segments(&loadable, data);

        Ok(Self {
            entry_point: elf.entry_point,
            e_flags: elf.e_flags,
            memory_segments,
            symbols: elf.symbols,
        })
    }

    /// Create an image from a raw binary mapped at `base` (not an ELF file).
    pub fn from_bytecode(bytecode: Vec<u8>, base: u64) -> Result<Self> {
        let end = base
            .checked_add(bytecode.len() as u64)
            .ok_or(ElfError::VirtualAddressOverflow)?;
        let segment = MemorySegment {
            virtual_start: base,
            virtual_end: end,
            data: bytecode,
            flags: PF_X | PF_R,
        };

        Ok(Self {
            entry_point: base,
            e_flags: 0,
            memory_segments: vec![segment],
            symbols: Vec::new(),
        })
    }

    /// Check if the ELF was built for the C (compressed) extension.
    pub const fn is_rvc(&self) -> bool {
        (self.e_flags & EF_RISCV_RVC) != 0
    }

    /// End of the highest segment; the initial program break.
    pub fn highest_address(&self) -> u64 {
        self.memory_segments
            .iter()
            .map(|s| s.virtual_end)
            .max()
            .unwrap_or(0)
    }

    /// Get total loaded size (sum of all segment memsz).
    pub fn total_size(&self) -> u64 {
        self.memory_segments.iter().map(MemorySegment::memsz).sum()
    }

    /// Name of the function symbol starting exactly at `addr`.
    pub fn function_at(&self, addr: u64) -> Option<&str> {
        self.symbols
            .iter()
            .find(|s| s.sym_type == STT_FUNC && s.value == addr && !s.name.is_empty())
            .map(|s| s.name.as_str())
    }

    /// Look up a symbol's value by name.
    pub fn lookup_symbol(&self, name: &str) -> Option<u64> {
        self.symbols.iter().find(|s| s.name == name).map(|s| s.value)
    }

    fn validate_segments(elf: &ElfFile, file_data: &[u8]) -> Result<Vec<ProgramHeader>> {
        let mut loadable = Vec::new();

        for phdr in &elf.program_headers {
            if phdr.p_type != PT_LOAD || phdr.memsz == 0 {
                continue;
            }
            let file_end = phdr
                .offset
                .checked_add(phdr.filesz)
                .ok_or(ElfError::SegmentBeyondFile)?;
            if file_end > file_data.len() as u64 {
                return Err(ElfError::SegmentBeyondFile);
            }
            if phdr.filesz > phdr.memsz {
                return Err(ElfError::FileSizeExceedsMemSize);
            }
            if phdr.vaddr.checked_add(phdr.memsz).is_none() {
                return Err(ElfError::VirtualAddressOverflow);
            }
            loadable.push(phdr.clone());
        }

        if loadable.is_empty() {
            return Err(ElfError::NoLoadableSegments);
        }
        if loadable.len() > MAX_SEGMENTS {
            return Err(ElfError::TooManySegments);
        }

        for (i, a) in loadable.iter().enumerate() {
            let a_end = a.vaddr + a.memsz;
            for b in loadable.iter().skip(i + 1) {
                let b_end = b.vaddr + b.memsz;
                if a.vaddr < b_end && b.vaddr < a_end {
                    return Err(ElfError::OverlappingSegments);
                }
            }
        }

        Ok(loadable)
    }

    /// Copy file data out of validated headers (BSS is zeroed at load time).
    fn load_segments(program_headers: &[ProgramHeader], file_data: &[u8]) -> Vec<MemorySegment> {
        program_headers
            .iter()
            .map(|phdr| {
                let start = phdr.offset as usize;
                let end = start + phdr.filesz as usize;
                MemorySegment {
                    virtual_start: phdr.vaddr,
                    virtual_end: phdr.vaddr + phdr.memsz,
                    data: file_data[start..end].to_vec(),
                    flags: phdr.flags,
                }
            })
            .collect()
    }
}
