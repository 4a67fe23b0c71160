//! ELF64 file parser.

use crate::constants::*;
use crate::header::*;
use crate::{ElfError, Result};

#[inline]
fn read_le16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

#[inline]
fn read_le32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[inline]
fn read_le64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Offset of table entry `index`, or `None` if it does not fit in `usize`.
fn entry_offset(base: u64, index: u16, entsize: u16) -> Option<usize> {
    let offset = base.checked_add(u64::from(index) * u64::from(entsize))?;
    usize::try_from(offset).ok()
}

/// Parsed ELF file.
#[derive(Clone, Debug)]
pub struct ElfFile {
    pub entry_point: u64,
    pub e_flags: u32,
    pub program_headers: Vec<ProgramHeader>,
    pub symbols: Vec<Symbol>,
}

impl ElfFile {
    /// Parse an ELF64 RISC-V file from raw bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let xlen = get_elf_xlen(data)?;
        if xlen != 64 {
            return Err(ElfError::XlenMismatch {
                expected: 64,
                actual: xlen,
            });
        }

        let header = Self::parse_header(data)?;
        let program_headers = Self::parse_program_headers(data, &header)?;
        let sections = Self::parse_section_headers(data, &header)?;
        let symbols = Self::parse_symbols(data, &sections);

        Ok(Self {
            entry_point: header.entry,
            e_flags: header.flags,
            program_headers,
            symbols,
        })
    }

    /// Look up a symbol's address by name.
    pub fn lookup_symbol(&self, name: &str) -> Option<u64> {
        self.symbols.iter().find(|s| s.name == name).map(|s| s.value)
    }

    /// Function symbols sorted by address.
    pub fn functions(&self) -> Vec<&Symbol> {
        let mut functions: Vec<_> = self
            .symbols
            .iter()
            .filter(|s| s.sym_type == STT_FUNC && !s.name.is_empty())
            .collect();
        functions.sort_by_key(|s| s.value);
        functions
    }

    pub const fn is_rvc(&self) -> bool {
        (self.e_flags & EF_RISCV_RVC) != 0
    }

    fn parse_header(data: &[u8]) -> Result<ElfHeader> {
        if data.len() < ELF64_EHDR_SIZE {
            return Err(ElfError::TooSmall);
        }
        if data[5] != ELF_DATA_LSB {
            return Err(ElfError::NotLittleEndian);
        }

        let field16 = |offset| read_le16(data, offset).ok_or(ElfError::TooSmall);
        let field32 = |offset| read_le32(data, offset).ok_or(ElfError::TooSmall);
        let field64 = |offset| read_le64(data, offset).ok_or(ElfError::TooSmall);

        let header = ElfHeader {
            class: data[4],
            data: data[5],
            machine: field16(18)?,
            entry: field64(24)?,
            phoff: field64(32)?,
            shoff: field64(40)?,
            flags: field32(48)?,
            phentsize: field16(54)?,
            phnum: field16(56)?,
            shentsize: field16(58)?,
            shnum: field16(60)?,
        };

        if header.machine != ELF_MACHINE_RISCV {
            return Err(ElfError::WrongMachine(header.machine));
        }
        Ok(header)
    }

    fn parse_program_headers(data: &[u8], header: &ElfHeader) -> Result<Vec<ProgramHeader>> {
        (0..header.phnum)
            .map(|i| {
                entry_offset(header.phoff, i, header.phentsize)
                    .and_then(|offset| Self::parse_program_header(data, offset))
                    .ok_or(ElfError::ProgramOutOfBounds)
            })
            .collect()
    }

    fn parse_program_header(data: &[u8], offset: usize) -> Option<ProgramHeader> {
        if offset.checked_add(ELF64_PHDR_SIZE)? > data.len() {
            return None;
        }
        Some(ProgramHeader {
            p_type: read_le32(data, offset)?,
            flags: read_le32(data, offset + 4)?,
            offset: read_le64(data, offset + 8)?,
            vaddr: read_le64(data, offset + 16)?,
            filesz: read_le64(data, offset + 32)?,
            memsz: read_le64(data, offset + 40)?,
        })
    }

    fn parse_section_headers(data: &[u8], header: &ElfHeader) -> Result<Vec<SectionHeader>> {
        (0..header.shnum)
            .map(|i| {
                entry_offset(header.shoff, i, header.shentsize)
                    .and_then(|offset| Self::parse_section_header(data, offset))
                    .ok_or(ElfError::SectionOutOfBounds)
            })
            .collect()
    }

    fn parse_section_header(data: &[u8], offset: usize) -> Option<SectionHeader> {
        if offset.checked_add(ELF64_SHDR_SIZE)? > data.len() {
            return None;
        }
        Some(SectionHeader {
            sh_type: read_le32(data, offset + 4)?,
            offset: read_le64(data, offset + 24)?,
            size: read_le64(data, offset + 32)?,
            link: read_le32(data, offset + 40)?,
            entsize: read_le64(data, offset + 56)?,
        })
    }

    /// Symbols from `.symtab`; a missing or malformed table yields none.
    fn parse_symbols(data: &[u8], sections: &[SectionHeader]) -> Vec<Symbol> {
        let Some(symtab) = sections.iter().find(|s| s.sh_type == SHT_SYMTAB) else {
            return Vec::new();
        };
        let Some(strtab) = usize::try_from(symtab.link)
            .ok()
            .and_then(|idx| sections.get(idx))
        else {
            return Vec::new();
        };
        let (Ok(symtab_offset), Ok(symtab_size), Ok(entsize), Ok(strtab_offset)) = (
            usize::try_from(symtab.offset),
            usize::try_from(symtab.size),
            usize::try_from(symtab.entsize),
            usize::try_from(strtab.offset),
        ) else {
            return Vec::new();
        };
        if entsize < ELF64_SYM_SIZE {
            return Vec::new();
        }

        (0..symtab_size / entsize)
            .filter_map(|i| Self::parse_symbol(data, symtab_offset + i * entsize, strtab_offset))
            .collect()
    }

    fn parse_symbol(data: &[u8], offset: usize, strtab_offset: usize) -> Option<Symbol> {
        let name_idx = usize::try_from(read_le32(data, offset)?).ok()?;
        let info = *data.get(offset + 4)?;
        Some(Symbol {
            name: extract_string(data, strtab_offset.checked_add(name_idx)?),
            value: read_le64(data, offset + 8)?,
            size: read_le64(data, offset + 16)?,
            sym_type: info & 0xf,
        })
    }
}

fn extract_string(data: &[u8], start: usize) -> String {
    let Some(bytes) = data.get(start..) else {
        return String::new();
    };
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Peek at ELF header to determine XLEN (32 or 64) without full parsing.
pub fn get_elf_xlen(data: &[u8]) -> Result<u8> {
    if data.len() < 5 {
        return Err(ElfError::TooSmall);
    }

    if read_le32(data, 0) != Some(ELF_MAGIC) {
        return Err(ElfError::NotElf);
    }

    match data[4] {
        ELF_CLASS_32 => Ok(32),
        ELF_CLASS_64 => Ok(64),
        other => Err(ElfError::UnsupportedClass(other)),
    }
}
