//! wrongpath CLI - wrong-path execution monitor

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        wrongpath::metrics::CliRecorder::new().install()
    } else {
        None
    };

    wrongpath::metrics::init();

    let default_level = if cli.verbose {
        "wrongpath=debug"
    } else if cli.silent {
        "wrongpath=error"
    } else {
        "wrongpath=info"
    };
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = default_level.parse() {
        filter = filter.add_directive(directive);
    }
    // Logs go to stderr; stdout carries the instruction trace.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    let exit_code = commands::run_command(&cli);

    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
