use anyhow::{Context, Result};
use callcost::cli::{Cli, Command, ReplayArgs};
use callcost::config::RecorderConfig;
use callcost::replay;
use callcost::report::{self, SummarySink};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to TRACE
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_replay(args: ReplayArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => RecorderConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => RecorderConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.default_threshold = threshold;
    }
    if let Some(format) = args.format {
        config.format = format;
    }

    let summary = Arc::new(SummarySink::new());
    let outcome = replay::replay_file(&args.file, &config, summary.clone())
        .with_context(|| format!("Failed to replay {}", args.file.display()))?;

    for slow in &outcome.reports {
        println!("{}", report::render(slow, config.format)?);
    }

    if args.summary {
        summary.print_summary();
        eprintln!(
            "{} events, {} slow calls, {} unmatched begins",
            outcome.events,
            outcome.reports.len(),
            outcome.unmatched
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    match args.command {
        Command::Replay(replay_args) => run_replay(replay_args)?,
    }

    Ok(())
}
