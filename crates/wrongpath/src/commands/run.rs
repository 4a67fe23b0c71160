//! Run command.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::error;
use wrongpath::{
    Error, NoopSink, ResolutionThreshold, RunConfig, RunResult, Runner, StopReason, TextSink,
    TraceSink,
};

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS, OutputFormat};
use crate::terminal::{self, Alignment, Table};

/// Handle the `run` command.
#[allow(clippy::too_many_arguments)]
pub fn cmd_run(
    input: &PathBuf,
    threshold: ResolutionThreshold,
    output: Option<&PathBuf>,
    no_trace: bool,
    raw_base: Option<u64>,
    memory_bits: u8,
    max_insns: Option<u64>,
    format: OutputFormat,
    silent: bool,
) -> i32 {
    let mut config = RunConfig::new()
        .with_threshold(threshold)
        .with_memory_bits(memory_bits);
    if let Some(limit) = max_insns {
        config = config.with_max_insns(limit);
    }

    if !silent && format == OutputFormat::Text {
        terminal::info(&format!(
            "Running {} with a branch resolution time of {threshold} instructions",
            input.display()
        ));
    }

    let outcome = if no_trace {
        run_with_sink(input, raw_base, config, NoopSink).0
    } else {
        let writer: Box<dyn Write> = match output {
            Some(path) => match File::create(path) {
                Ok(file) => Box::new(BufWriter::new(file)),
                Err(e) => {
                    error!(error = %e, path = %path.display(), "failed to create trace file");
                    return EXIT_FAILURE;
                }
            },
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        let (outcome, sink) = run_with_sink(input, raw_base, config, TextSink::new(writer));
        let flushed = sink.map(TextSink::into_inner);
        match (outcome, flushed) {
            (Ok(_), Some(Err(e))) => Err(Error::Trace(e)),
            (outcome, _) => outcome,
        }
    };

    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, path = %input.display(), "run failed");
            if !silent {
                terminal::error(&format!("{e}"));
            }
            return EXIT_FAILURE;
        }
    };

    wrongpath::metrics::record_run(threshold.get(), &result);

    if !result.guest_output.is_empty() {
        let mut stdout = io::stdout().lock();
        let _ = stdout.write_all(&result.guest_output);
        let _ = stdout.flush();
    }

    match format {
        OutputFormat::Json => result.print_json(),
        OutputFormat::Text if !silent => print_summary(&result, output.map(PathBuf::as_path)),
        OutputFormat::Text => {}
    }

    match result.stop {
        StopReason::Exited(code) => i32::from(code),
        StopReason::InstructionLimit => EXIT_SUCCESS,
    }
}

/// Load and run, handing the sink back even when the run fails so a partial
/// trace can still be flushed. The sink is `None` if loading failed.
fn run_with_sink<S: TraceSink>(
    input: &Path,
    raw_base: Option<u64>,
    config: RunConfig,
    sink: S,
) -> (wrongpath::Result<RunResult>, Option<S>) {
    let mut runner = match Runner::from_file(input, raw_base, config, sink) {
        Ok(runner) => runner,
        Err(e) => return (Err(e), None),
    };
    let outcome = runner.run();
    (outcome, Some(runner.into_sink()))
}

fn print_summary(result: &RunResult, trace_path: Option<&Path>) {
    match result.stop {
        StopReason::Exited(code) => terminal::success(&format!(
            "Exited with code {code} after {} instructions ({:.3}s)",
            result.instret, result.time_secs
        )),
        StopReason::InstructionLimit => terminal::warning(&format!(
            "Stopped at the instruction limit after {} observed instructions",
            result.observed
        )),
    }
    if let Some(path) = trace_path {
        terminal::path_output(path);
    }

    let stats = &result.stats;
    terminal::header("Speculation");
    let mut table =
        Table::new(vec!["", "count"]).with_alignments(vec![Alignment::Left, Alignment::Right]);
    for (name, value) in [
        ("speculations", stats.speculations),
        ("rollbacks", stats.rollbacks),
        ("checkpoint overwrites", stats.overwrites),
        ("wrong-path executed", stats.wrong_path_instructions),
        ("wrong-path squashed", stats.squashed),
        ("observed", result.observed),
    ] {
        table.add_row(vec![name.to_string(), value.to_string()]);
    }
    table.print();
}
