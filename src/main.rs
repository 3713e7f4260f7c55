// src/main.rs

mod assembler;
mod blame;
mod cli;
mod config;
mod diff;
mod error;
mod external;
mod matcher;
mod model;
mod pipeline;
mod splitter;

use clap::Parser;
use cli::Args;
use config::Config;
use external::FormatterCommand;
use indicatif::{ParallelProgressIterator, ProgressBar};
use rayon::prelude::*;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    let config = Config::from_args(&args);

    let formatter = match FormatterCommand::new(args.formatter.clone())
        .and_then(|formatter| formatter.validate_for(&args.files).map(|_| formatter))
    {
        Ok(formatter) => formatter,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let start_time = Instant::now();
    let bar = if config.verbosity == 0 {
        ProgressBar::new(args.files.len() as u64)
    } else {
        ProgressBar::hidden()
    };

    // Files share nothing, so each runs its own pipeline.
    let failures = args
        .files
        .par_iter()
        .progress_with(bar)
        .filter(|file| match pipeline::process_file(file, &formatter, &config) {
            Ok(report) => {
                println!(
                    "# {}: {} patches over {} chunks created",
                    file.display(),
                    report.patches.len(),
                    report.chunks
                );
                false
            }
            Err(e) => {
                error!("{}: {e}", file.display());
                true
            }
        })
        .count();

    info!("finished in {:.2?}", start_time.elapsed());
    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
