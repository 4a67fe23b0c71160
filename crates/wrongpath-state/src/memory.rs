//! Flat guest memory with a store journal.
//!
//! Addresses wrap modulo the memory size, so every guest access lands
//! somewhere and wild wrong-path pointers cannot fault the host.

use rustc_hash::FxHashMap;
use thiserror::Error;
use wrongpath_elf::ElfImage;

pub const MIN_MEMORY_BITS: u8 = 12;
pub const MAX_MEMORY_BITS: u8 = 32;

/// Default memory size (64 MiB).
pub const DEFAULT_MEMORY_BITS: u8 = 26;

/// Guest memory errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("memory size 2^{0} out of range ({MIN_MEMORY_BITS}..={MAX_MEMORY_BITS} bits)")]
    InvalidSize(u8),

    #[error("segment at {addr:#x} ({size:#x} bytes) does not fit in {capacity:#x} bytes of memory")]
    SegmentTooLarge { addr: u64, size: u64, capacity: u64 },

    #[error("segments at {first:#x} and {second:#x} alias in {capacity:#x} bytes of memory")]
    SegmentsAlias { first: u64, second: u64, capacity: u64 },
}

/// Byte-addressable guest memory.
pub struct GuestMemory {
    data: Vec<u8>,
    mask: u64,
    /// Original value of every byte stored to since the journal was opened.
    journal: Option<FxHashMap<usize, u8>>,
}

impl GuestMemory {
    /// Allocate `2^bits` zeroed bytes.
    pub fn new(bits: u8) -> Result<Self, MemoryError> {
        if !(MIN_MEMORY_BITS..=MAX_MEMORY_BITS).contains(&bits) {
            return Err(MemoryError::InvalidSize(bits));
        }
        let size = 1usize << bits;
        Ok(Self {
            data: vec![0; size],
            mask: (size - 1) as u64,
            journal: None,
        })
    }

    pub const fn size(&self) -> u64 {
        self.mask + 1
    }

    #[inline]
    const fn index(&self, addr: u64) -> usize {
        (addr & self.mask) as usize
    }

    /// Copy every segment of `image` in and zero its BSS.
    ///
    /// Bypasses the journal.
    pub fn load_image(&mut self, image: &ElfImage) -> Result<(), MemoryError> {
        let mut spans = Vec::with_capacity(image.memory_segments.len());
        for segment in &image.memory_segments {
            if segment.memsz() > self.size() {
                return Err(MemoryError::SegmentTooLarge {
                    addr: segment.virtual_start,
                    size: segment.memsz(),
                    capacity: self.size(),
                });
            }
            spans.push((
                segment.virtual_start,
                self.physical_ranges(segment.virtual_start, segment.memsz()),
            ));
        }
        for (i, (first, a)) in spans.iter().enumerate() {
            for (second, b) in &spans[i + 1..] {
                if a.iter().any(|&x| b.iter().any(|&y| ranges_overlap(x, y))) {
                    return Err(MemoryError::SegmentsAlias {
                        first: *first,
                        second: *second,
                        capacity: self.size(),
                    });
                }
            }
        }

        for segment in &image.memory_segments {
            let mut addr = segment.virtual_start;
            for &byte in &segment.data {
                let idx = self.index(addr);
                self.data[idx] = byte;
                addr = addr.wrapping_add(1);
            }
            for _ in 0..segment.bss_size() {
                let idx = self.index(addr);
                self.data[idx] = 0;
                addr = addr.wrapping_add(1);
            }
        }
        Ok(())
    }

    /// Half-open index ranges covered by `len` bytes at `addr`, split where
    /// the span wraps. `len` must not exceed the memory size.
    const fn physical_ranges(&self, addr: u64, len: u64) -> [(u64, u64); 2] {
        let start = addr & self.mask;
        let end = start + len;
        if end <= self.size() {
            [(start, end), (0, 0)]
        } else {
            [(start, self.size()), (0, end - self.size())]
        }
    }

    pub fn read_bytes(&self, addr: u64, buf: &mut [u8]) {
        for (offset, byte) in (0u64..).zip(buf.iter_mut()) {
            *byte = self.data[self.index(addr.wrapping_add(offset))];
        }
    }

    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
        for (offset, &byte) in (0u64..).zip(bytes) {
            let idx = self.index(addr.wrapping_add(offset));
            if let Some(journal) = self.journal.as_mut() {
                journal.entry(idx).or_insert(self.data[idx]);
            }
            self.data[idx] = byte;
        }
    }

    #[inline]
    fn read<const N: usize>(&self, addr: u64) -> [u8; N] {
        let mut buf = [0u8; N];
        self.read_bytes(addr, &mut buf);
        buf
    }

    pub fn read_u8(&self, addr: u64) -> u8 {
        self.data[self.index(addr)]
    }

    pub fn read_u16(&self, addr: u64) -> u16 {
        u16::from_le_bytes(self.read(addr))
    }

    pub fn read_u32(&self, addr: u64) -> u32 {
        u32::from_le_bytes(self.read(addr))
    }

    pub fn read_u64(&self, addr: u64) -> u64 {
        u64::from_le_bytes(self.read(addr))
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) {
        self.write_bytes(addr, &[value]);
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) {
        self.write_bytes(addr, &value.to_le_bytes());
    }

    /// Start recording stores, discarding any journal already open.
    pub fn begin_journal(&mut self) {
        self.journal = Some(FxHashMap::default());
    }

    /// Restore every byte stored to since [`begin_journal`] and stop
    /// recording. Returns the number of bytes restored.
    ///
    /// [`begin_journal`]: Self::begin_journal
    pub fn undo_journal(&mut self) -> usize {
        let Some(journal) = self.journal.take() else {
            return 0;
        };
        let restored = journal.len();
        for (idx, original) in journal {
            self.data[idx] = original;
        }
        restored
    }

    /// Stop recording and keep every store.
    pub fn commit_journal(&mut self) {
        self.journal = None;
    }

    pub const fn is_journaling(&self) -> bool {
        self.journal.is_some()
    }

    /// Number of distinct bytes modified since the journal was opened.
    pub fn journal_len(&self) -> usize {
        self.journal.as_ref().map_or(0, FxHashMap::len)
    }
}

const fn ranges_overlap(a: (u64, u64), b: (u64, u64)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

impl std::fmt::Debug for GuestMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuestMemory")
            .field("size", &self.size())
            .field("journal", &self.journal_len())
            .finish_non_exhaustive()
    }
}
