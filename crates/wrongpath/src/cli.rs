//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use wrongpath::ResolutionThreshold;
use wrongpath_state::{DEFAULT_MEMORY_BITS, MAX_MEMORY_BITS, MIN_MEMORY_BITS};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "wrongpath")]
#[command(about = "Wrong-path execution monitor - runs every branch's other direction first")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a program, speculating down the wrong path of every branch
    Run {
        /// Program to run (RV64 ELF, or raw binary with --raw)
        #[arg(value_name = "PROGRAM")]
        input: PathBuf,

        /// Branch resolution time: wrong-path instructions before rollback
        #[arg(
            short = 'n',
            long = "resolution-time",
            value_name = "N",
            default_value = "0",
            allow_hyphen_values = true
        )]
        threshold: ResolutionThreshold,

        /// Write the instruction trace to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Do not write the instruction trace
        #[arg(long, conflicts_with = "output")]
        no_trace: bool,

        #[command(flatten)]
        program: ProgramArgs,

        /// Guest memory size as a power of two
        #[arg(
            long,
            default_value_t = DEFAULT_MEMORY_BITS,
            value_parser = clap::value_parser!(u8)
                .range(i64::from(MIN_MEMORY_BITS)..=i64::from(MAX_MEMORY_BITS))
        )]
        memory_bits: u8,

        /// Stop after this many observed instructions
        #[arg(long, value_name = "N")]
        max_insns: Option<u64>,

        /// Output format for the run summary
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Disassemble the executable segments of a program
    Disasm {
        /// Program to disassemble
        #[arg(value_name = "PROGRAM")]
        input: PathBuf,

        #[command(flatten)]
        program: ProgramArgs,

        /// Stop after this many instructions
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },
}

/// How to interpret the program file.
#[derive(clap::Args, Clone, Copy, Debug)]
pub struct ProgramArgs {
    /// Treat the input as a raw binary instead of an ELF file
    #[arg(long)]
    pub raw: bool,

    /// Load and entry address for raw binaries (hex with 0x prefix, or decimal)
    #[arg(long, value_name = "ADDR", value_parser = parse_address, requires = "raw")]
    pub base: Option<u64>,
}

impl ProgramArgs {
    /// Raw load address, or `None` for ELF input.
    pub fn raw_base(&self) -> Option<u64> {
        self.raw
            .then(|| self.base.unwrap_or(wrongpath::DEFAULT_RAW_BASE))
    }
}

/// Output format for run summaries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Styled summary on stderr
    #[default]
    Text,
    /// One JSON object on stdout
    Json,
}

fn parse_address(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => s.replace('_', "").parse(),
    };
    parsed.map_err(|e| format!("invalid address '{s}': {e}"))
}
