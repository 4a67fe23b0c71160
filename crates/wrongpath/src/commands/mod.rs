//! Command implementations.

mod disasm;
mod run;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Run { .. } => handle_run(cli),
        Commands::Disasm { .. } => handle_disasm(cli),
    }
}

fn handle_run(cli: &Cli) -> i32 {
    let Commands::Run {
        input,
        threshold,
        output,
        no_trace,
        program,
        memory_bits,
        max_insns,
        format,
    } = &cli.command
    else {
        unreachable!("run command variant mismatch");
    };

    run::cmd_run(
        input,
        *threshold,
        output.as_ref(),
        *no_trace,
        program.raw_base(),
        *memory_bits,
        *max_insns,
        *format,
        cli.silent,
    )
}

fn handle_disasm(cli: &Cli) -> i32 {
    let Commands::Disasm {
        input,
        program,
        limit,
    } = &cli.command
    else {
        unreachable!("disasm command variant mismatch");
    };

    disasm::cmd_disasm(input, program.raw_base(), *limit)
}
