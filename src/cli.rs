// src/cli.rs

use crate::config::DEFAULT_IGNORE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Reformat code, maintain blame.",
    override_usage = "blame-bridge [OPTIONS] <FILES>... -f <FORMATTER>..."
)]
pub struct Args {
    /// Files to reformat
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Formatter command line; use {input} for the input file name and {output} for the output file name
    #[arg(
        short,
        long,
        required = true,
        num_args = 1..,
        allow_hyphen_values = true
    )]
    pub formatter: Vec<String>,

    /// Characters to ignore when comparing lines; include those the formatter might change
    #[arg(short, long, default_value = DEFAULT_IGNORE)]
    pub ignore: String,

    /// Increase output (-v: progress, -vv: also authorship headers)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
