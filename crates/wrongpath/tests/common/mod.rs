#![allow(dead_code)]

use wrongpath::{
    ElfImage, RecordingSink, ResolutionThreshold, RunConfig, RunResult, Runner, TraceEvent,
};
use wrongpath_isa::{REG_A0, REG_A7, asm};

pub const BASE: u64 = 0x8000_0000;

/// Small memory keeps tests fast; programs stay well inside it.
pub const MEMORY_BITS: u8 = 16;

/// Guard against runaway guests.
pub const MAX_INSNS: u64 = 100_000;

pub fn config(threshold: u32) -> RunConfig {
    RunConfig::new()
        .with_threshold(ResolutionThreshold::new(threshold))
        .with_memory_bits(MEMORY_BITS)
        .with_max_insns(MAX_INSNS)
}

/// `exit(code)` as three instructions.
pub fn exit(code: i32) -> [u32; 3] {
    [
        asm::addi(REG_A0, 0, code),
        asm::addi(REG_A7, 0, 93),
        asm::ecall(),
    ]
}

/// `exit(a0)` as two instructions.
pub fn exit_a0() -> [u32; 2] {
    [asm::addi(REG_A7, 0, 93), asm::ecall()]
}

/// Run `words` assembled at [`BASE`].
pub fn run_words(words: &[u32], threshold: u32) -> (RunResult, RecordingSink) {
    let image = ElfImage::from_bytecode(asm::assemble(words), BASE).expect("valid image");
    let mut runner =
        Runner::new(&image, config(threshold), RecordingSink::new()).expect("runner loads");
    let result = runner.run().expect("guest runs to completion");
    (result, runner.into_sink())
}

/// Addresses observed on the correct path, in order.
pub fn correct_path(sink: &RecordingSink) -> Vec<u64> {
    sink.events
        .iter()
        .filter_map(|event| match event {
            TraceEvent::Instruction {
                addr,
                wrong_path: None,
                ..
            } => Some(*addr),
            _ => None,
        })
        .collect()
}

/// Wrong-path counts split into one run per excursion.
pub fn excursions(sink: &RecordingSink) -> Vec<Vec<u32>> {
    let mut runs: Vec<Vec<u32>> = Vec::new();
    let mut current: Option<Vec<u32>> = None;
    for event in &sink.events {
        match event {
            TraceEvent::Redirect { .. } => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
                current = Some(Vec::new());
            }
            TraceEvent::Instruction {
                wrong_path: Some(count),
                ..
            } => {
                if let Some(run) = current.as_mut() {
                    run.push(*count);
                }
            }
            TraceEvent::Rollback { .. } => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            }
            _ => {}
        }
    }
    runs.extend(current);
    runs
}

/// Minimal RV64 ELF executable with one RX segment at `vaddr`.
pub fn build_elf(entry: u64, vaddr: u64, code: &[u8]) -> Vec<u8> {
    const EHDR: usize = 64;
    const PHDR: usize = 56;

    let mut elf = vec![0u8; EHDR];
    elf[..4].copy_from_slice(b"\x7fELF");
    elf[4] = 2; // ELFCLASS64
    elf[5] = 1; // little endian
    elf[6] = 1;
    elf[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
    elf[18..20].copy_from_slice(&243u16.to_le_bytes()); // EM_RISCV
    elf[20..24].copy_from_slice(&1u32.to_le_bytes());
    elf[24..32].copy_from_slice(&entry.to_le_bytes());
    elf[32..40].copy_from_slice(&(EHDR as u64).to_le_bytes());
    elf[52..54].copy_from_slice(&(EHDR as u16).to_le_bytes());
    elf[54..56].copy_from_slice(&(PHDR as u16).to_le_bytes());
    elf[56..58].copy_from_slice(&1u16.to_le_bytes());

    let mut phdr = vec![0u8; PHDR];
    phdr[0..4].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
    phdr[4..8].copy_from_slice(&5u32.to_le_bytes()); // R | X
    phdr[8..16].copy_from_slice(&((EHDR + PHDR) as u64).to_le_bytes());
    phdr[16..24].copy_from_slice(&vaddr.to_le_bytes());
    phdr[24..32].copy_from_slice(&vaddr.to_le_bytes());
    phdr[32..40].copy_from_slice(&(code.len() as u64).to_le_bytes());
    phdr[40..48].copy_from_slice(&(code.len() as u64).to_le_bytes());
    phdr[48..56].copy_from_slice(&4u64.to_le_bytes());

    elf.extend_from_slice(&phdr);
    elf.extend_from_slice(code);
    elf
}
