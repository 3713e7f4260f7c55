// src/assembler.rs

use crate::blame::augment;
use crate::config::Config;
use crate::diff::write_hunk;
use crate::model::{AttributedChunk, Chunk, PatchArtifact};
use tracing::{debug, info};

/// Pulls chunks out author by author, in order of each author's first
/// chunk. Patches are meant to be applied in the returned order: every
/// extraction rewrites the context and line numbers of the chunks left
/// behind as if the extracted patch had already been applied.
pub fn assemble(chunks: Vec<AttributedChunk>, config: &Config) -> Vec<PatchArtifact> {
    // File order is remembered so ties between chunks at the same line
    // (insertions next to each other) keep their order.
    let mut remaining: Vec<(usize, AttributedChunk)> = chunks.into_iter().enumerate().collect();
    let mut artifacts = Vec::new();

    while let Some((_, first)) = remaining.first() {
        let author = first.author.clone();
        let (taken, mut rest): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(_, chunk)| chunk.author.id == author.id);

        for (position, other) in rest.iter_mut() {
            let mut shift = 0;
            for (_, extracted) in taken.iter().filter(|(p, _)| *p < *position) {
                other.chunk.update(&extracted.chunk, true);
                shift += extracted.chunk.delta();
            }
            // Trailing splices are placed relative to the chunk's end, so the
            // furthest one goes first to keep nearer offsets valid.
            for (_, extracted) in taken.iter().rev().filter(|(p, _)| *p > *position) {
                other.chunk.update(&extracted.chunk, false);
            }
            other.chunk.original.shift(shift);
        }

        let mut collected: Vec<Chunk> = taken.into_iter().map(|(_, c)| c.chunk).collect();
        renumber(&mut collected);

        info!(
            "patch {} from {}: {} chunks",
            artifacts.len() + 1,
            author.id,
            collected.len()
        );
        if config.verbosity > 1 {
            debug!("{}", author.header(false));
        }
        artifacts.push(PatchArtifact {
            author,
            chunks: collected,
        });
        remaining = rest;
    }
    artifacts
}

/// Numbers the changed side of a patch's chunks as if the patch were the
/// only one applied.
fn renumber(chunks: &mut [Chunk]) {
    let mut offset = 0;
    for chunk in chunks.iter_mut() {
        chunk.reset_changed_start();
        chunk.changed.shift(offset);
        offset += chunk.delta();
    }
}

/// Runs of chunks whose context windows overlap, each written as one hunk.
fn hunks(chunks: &[Chunk]) -> Vec<&[Chunk]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..chunks.len() {
        if chunks[i - 1].context_overlap(&chunks[i]) <= 0 {
            groups.push(&chunks[start..i]);
            start = i;
        }
    }
    if start < chunks.len() {
        groups.push(&chunks[start..]);
    }
    groups
}

impl PatchArtifact {
    /// The patch file: authorship header, file header and hunks.
    pub fn render(&self, path: &str, config: &Config) -> String {
        let mut out = augment(&self.author, config).header(false);
        out.push_str(&format!("--- a/{path}\n+++ b/{path}\n"));
        for hunk in hunks(&self.chunks) {
            write_hunk(hunk, &mut out);
        }
        out
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}
