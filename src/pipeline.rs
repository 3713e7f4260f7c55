// src/pipeline.rs

use crate::assembler::assemble;
use crate::blame::{default_record, parse_blame, BlameCursor};
use crate::config::Config;
use crate::diff::parse_diff;
use crate::error::BridgeResult;
use crate::external::{self, FormatterCommand};
use crate::model::{AttributedChunk, AuthorRecord, PatchArtifact};
use crate::splitter::split_chunk;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Outcome for one input file.
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    pub patches: Vec<PathBuf>,
    pub chunks: usize,
}

/// Pairs every chunk of `diff` with the author it belongs to, splitting
/// chunks that span several authors.
pub fn attribute(
    diff: &str,
    records: Vec<AuthorRecord>,
    config: &Config,
) -> BridgeResult<Vec<AttributedChunk>> {
    let mut cursor = BlameCursor::new(records);
    let mut attributed = Vec::new();
    for chunk in parse_diff(diff) {
        let chunk = chunk?;
        if chunk.original.is_empty() {
            // Pure insertion: no original line to credit.
            attributed.push(AttributedChunk {
                chunk,
                author: default_record(config),
            });
            continue;
        }
        let records = cursor.range(chunk.original.start, chunk.original.end())?;
        attributed.extend(split_chunk(chunk, records, config)?);
    }
    Ok(attributed)
}

/// Turns a unified diff and the porcelain blame of the original file into
/// per-author patches, in the order they must be applied.
pub fn bridge(diff: &str, blame: &str, config: &Config) -> BridgeResult<Vec<PatchArtifact>> {
    let records = parse_blame(blame)?;
    debug!("{} blame records", records.len());
    let chunks = attribute(diff, records, config)?;
    Ok(assemble(chunks, config))
}

/// Where the `number`th patch for `file` is written.
pub fn patch_path(file: &Path, number: usize) -> PathBuf {
    let mut name = file.as_os_str().to_owned();
    name.push(format!(".bridge{number:03}"));
    PathBuf::from(name)
}

/// Formats `file`, then writes its per-author patches next to it.
pub fn process_file(
    file: &Path,
    formatter: &FormatterCommand,
    config: &Config,
) -> BridgeResult<FileReport> {
    let formatted = formatter.run(file)?;
    let diff = external::unified_diff(file, formatted.path())?;
    let blame = external::blame(file)?;
    let relative = external::repo_relative_path(file)?;

    let artifacts = bridge(&diff, &blame, config)?;
    let mut report = FileReport::default();
    for (i, artifact) in artifacts.iter().enumerate() {
        let path = patch_path(file, i + 1);
        fs::write(&path, artifact.render(&relative, config))?;
        info!("--- {}", path.display());
        report.chunks += artifact.chunk_count();
        report.patches.push(path);
    }
    Ok(report)
}
