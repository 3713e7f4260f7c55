// src/error.rs

/// Everything that can abort processing of a single file.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("can't parse @@ line: {0}")]
    MalformedDiffHeader(String),

    #[error("unknown diff line: {0}")]
    UnknownDiffLine(String),

    #[error("can't parse blame line: {0}")]
    MalformedBlameLine(String),

    #[error("out of range, missing blame for line {line}")]
    BlameRangeExhausted { line: usize },

    #[error("out of range, blame queried at line {start} after line {floor}")]
    BlameOutOfOrder { start: usize, floor: usize },

    #[error("not enough lines remaining: wanted {requested}, have {available}")]
    InsufficientChunkLines { requested: usize, available: usize },

    #[error("error running formatter: {0}")]
    Formatter(String),

    #[error("invalid formatter command: {0}")]
    InvalidFormatter(String),

    #[error("{program} failed: {detail}")]
    ExternalTool { program: String, detail: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
