//! ELF64 header structures.

/// ELF header.
#[derive(Clone, Debug)]
pub struct ElfHeader {
    pub class: u8,
    pub data: u8,
    pub machine: u16,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
}

/// Program header.
#[derive(Clone, Debug)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub flags: u32,
    pub offset: u64,
    pub vaddr: u64,
    pub filesz: u64,
    pub memsz: u64,
}

/// Section header, as far as symbol lookup needs it.
#[derive(Clone, Debug)]
pub struct SectionHeader {
    pub sh_type: u32,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub entsize: u64,
}

/// ELF symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    /// Address for functions and objects.
    pub value: u64,
    pub size: u64,
    /// `STT_FUNC`, `STT_OBJECT`, ...
    pub sym_type: u8,
}
