// src/config.rs

use crate::cli::Args;

/// Number of unchanged lines kept on either side of a chunk.
pub const CONTEXT_LINES: usize = 3;

pub const DEFAULT_IGNORE: &str = " \t\r\n";

/// Characters dropped before two lines are compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreSet(Vec<char>);

impl IgnoreSet {
    pub fn new(chars: &str) -> Self {
        let mut set: Vec<char> = chars.chars().collect();
        set.sort_unstable();
        set.dedup();
        IgnoreSet(set)
    }

    pub fn contains(&self, c: char) -> bool {
        self.0.binary_search(&c).is_ok()
    }

    /// The line with every ignored character removed.
    pub fn strip(&self, line: &str) -> Vec<char> {
        line.chars().filter(|&c| !self.contains(c)).collect()
    }
}

impl Default for IgnoreSet {
    fn default() -> Self {
        IgnoreSet::new(DEFAULT_IGNORE)
    }
}

/// Immutable settings for one run, handed to every stage.
#[derive(Debug, Clone)]
pub struct Config {
    pub ignore: IgnoreSet,
    pub verbosity: u8,
    /// Seconds since the epoch at which the reformat was run.
    pub reformat_time: i64,
}

impl Config {
    pub fn from_args(args: &Args) -> Self {
        Config {
            ignore: IgnoreSet::new(&args.ignore),
            verbosity: args.verbose,
            ..Config::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ignore: IgnoreSet::default(),
            verbosity: 0,
            reformat_time: chrono::Utc::now().timestamp(),
        }
    }
}
