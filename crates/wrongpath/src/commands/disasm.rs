//! Disasm command.

use std::io::{self, Write};
use std::path::Path;

use tracing::error;
use wrongpath::load_program;
use wrongpath_isa::{CompositeDecoder, INSN_BYTES};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal;

/// Handle the `disasm` command.
pub fn cmd_disasm(input: &Path, raw_base: Option<u64>, limit: Option<usize>) -> i32 {
    let image = match load_program(input, raw_base) {
        Ok(image) => image,
        Err(e) => {
            error!(error = %e, path = %input.display(), "failed to load program");
            terminal::error(&format!("{e}"));
            return EXIT_FAILURE;
        }
    };

    let decoder = CompositeDecoder::standard();
    let mut out = io::stdout().lock();
    let mut printed = 0usize;

    for segment in image.memory_segments.iter().filter(|s| s.is_executable()) {
        let words = segment.data.chunks_exact(usize::from(INSN_BYTES));
        for (pc, bytes) in (segment.virtual_start..)
            .step_by(usize::from(INSN_BYTES))
            .zip(words)
        {
            if limit.is_some_and(|limit| printed >= limit) {
                return EXIT_SUCCESS;
            }
            if let Some(name) = image.function_at(pc)
                && writeln!(out, "\n{pc:016x} <{name}>:").is_err()
            {
                return EXIT_FAILURE;
            }
            let raw = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let text = decoder
                .decode(bytes, pc)
                .map_or_else(|| "unknown".to_string(), |instr| decoder.disasm(&instr));
            if writeln!(out, "{pc:8x}:\t{raw:08x}\t{text}").is_err() {
                return EXIT_FAILURE;
            }
            printed += 1;
        }
    }
    EXIT_SUCCESS
}
