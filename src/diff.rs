// src/diff.rs

use crate::config::CONTEXT_LINES;
use crate::error::{BridgeError, BridgeResult};
use crate::model::{Chunk, LineSpan};
use regex::Regex;
use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::SplitInclusive;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file\n";

/// Lazily turns unified diff text into chunks. A chunk is yielded as soon as
/// it has a full window of trailing context, so large hunks are streamed.
pub struct ChunkParser<'a> {
    lines: Peekable<SplitInclusive<'a, char>>,
    header: Regex,
    ready: VecDeque<Chunk>,
    pending: VecDeque<Chunk>,
    context: Vec<String>,
    original: Vec<String>,
    changed: Vec<String>,
    original_line: usize,
    changed_line: usize,
    done: bool,
}

/// Parses the diff for a single file. Everything up to and including the
/// `---`/`+++` file header is skipped.
pub fn parse_diff(text: &str) -> ChunkParser<'_> {
    let mut lines = text.split_inclusive('\n').peekable();
    while lines.next_if(|line| !line.starts_with("---")).is_some() {}
    lines.next();
    lines.next_if(|line| line.starts_with("+++"));

    ChunkParser {
        lines,
        header: Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
            .expect("hunk header pattern is valid"),
        ready: VecDeque::new(),
        pending: VecDeque::new(),
        context: Vec::new(),
        original: Vec::new(),
        changed: Vec::new(),
        original_line: 0,
        changed_line: 0,
        done: false,
    }
}

impl ChunkParser<'_> {
    fn consume(&mut self, line: &str) -> BridgeResult<()> {
        let mut chars = line.chars();
        let operation = chars.next().unwrap_or(' ');
        let remainder = chars.as_str();
        // Some tools strip the space from empty context lines.
        let remainder = if operation == '\n' { line } else { remainder };

        match operation {
            '@' => {
                self.finish_hunk();
                self.start_hunk(line)?;
            }
            '-' => {
                self.original.push(remainder.to_string());
                // Deleted lines follow earlier chunks in the original file but
                // must not leak into leading context until the run is closed.
                self.save_trailing(remainder);
            }
            '+' => self.changed.push(remainder.to_string()),
            ' ' | '\n' => {
                self.close_run();
                self.original_line += 1;
                self.changed_line += 1;
                self.context.push(remainder.to_string());
                if self.context.len() > CONTEXT_LINES {
                    self.context.remove(0);
                }
                self.save_trailing(remainder);
            }
            '\\' => {}
            _ => return Err(BridgeError::UnknownDiffLine(line.trim_end().to_string())),
        }
        Ok(())
    }

    fn start_hunk(&mut self, line: &str) -> BridgeResult<()> {
        let caps = self
            .header
            .captures(line)
            .ok_or_else(|| BridgeError::MalformedDiffHeader(line.trim_end().to_string()))?;
        let number = |i: usize, default: usize| -> BridgeResult<usize> {
            match caps.get(i) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| BridgeError::MalformedDiffHeader(line.trim_end().to_string())),
                None => Ok(default),
            }
        };
        let (original_start, original_count) = (number(1, 0)?, number(2, 1)?);
        let (changed_start, changed_count) = (number(3, 0)?, number(4, 1)?);

        // An empty side names the line before the change.
        self.original_line = if original_count == 0 { original_start + 1 } else { original_start };
        self.changed_line = if changed_count == 0 { changed_start + 1 } else { changed_start };
        self.context.clear();
        Ok(())
    }

    /// Turns the accumulated deletion/insertion run into a pending chunk.
    fn close_run(&mut self) {
        if self.original.is_empty() && self.changed.is_empty() {
            return;
        }
        let original = LineSpan::new(self.original_line, std::mem::take(&mut self.original));
        let changed = LineSpan::new(self.changed_line, std::mem::take(&mut self.changed));
        self.original_line = original.end();
        self.changed_line = changed.end();

        let chunk = Chunk::new(original, changed, self.context.clone(), Vec::new());
        self.context.extend(chunk.original.lines.iter().cloned());
        if self.context.len() > CONTEXT_LINES {
            self.context.drain(..self.context.len() - CONTEXT_LINES);
        }
        self.pending.push_back(chunk);
    }

    fn save_trailing(&mut self, line: &str) {
        for chunk in self.pending.iter_mut() {
            if chunk.post_context.len() < CONTEXT_LINES {
                chunk.post_context.push(line.to_string());
            }
        }
        while self
            .pending
            .front()
            .is_some_and(|chunk| chunk.post_context.len() >= CONTEXT_LINES)
        {
            if let Some(chunk) = self.pending.pop_front() {
                self.ready.push_back(chunk);
            }
        }
    }

    fn finish_hunk(&mut self) {
        self.close_run();
        self.ready.extend(self.pending.drain(..));
    }
}

impl Iterator for ChunkParser<'_> {
    type Item = BridgeResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(Ok(chunk));
            }
            if self.done {
                return None;
            }
            match self.lines.next() {
                Some(line) => {
                    let missing_newline = self
                        .lines
                        .next_if(|next| next.starts_with('\\'))
                        .is_some();
                    let line = match line.strip_suffix('\n') {
                        Some(stripped) if missing_newline => stripped,
                        _ => line,
                    };
                    if let Err(e) = self.consume(line) {
                        self.done = true;
                        self.ready.clear();
                        return Some(Err(e));
                    }
                }
                None => {
                    self.finish_hunk();
                    self.done = true;
                }
            }
        }
    }
}

fn push_line(out: &mut String, prefix: char, line: &str) {
    out.push(prefix);
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
        out.push_str(NO_NEWLINE_MARKER);
    }
}

/// Writes `chunks` as one `@@` hunk. The chunks must be in file order with
/// overlapping context windows; shared context is written once.
pub fn write_hunk(chunks: &[Chunk], out: &mut String) {
    let Some(first) = chunks.first() else {
        return;
    };

    let mut body: Vec<(char, &str)> = Vec::new();
    let mut prev: Option<&Chunk> = None;
    for chunk in chunks {
        let mut skip = 0;
        if let Some(prev) = prev {
            let overlap = prev.context_overlap(chunk).max(0) as usize;
            let removed = overlap.min(prev.post_context.len());
            skip = overlap - removed;
            let kept = prev.post_context.len() - removed;
            body.extend(prev.post_context[..kept].iter().map(|l| (' ', l.as_str())));
        }
        let skip = skip.min(chunk.pre_context.len());
        body.extend(chunk.pre_context[skip..].iter().map(|l| (' ', l.as_str())));
        body.extend(chunk.original.lines.iter().map(|l| ('-', l.as_str())));
        body.extend(chunk.changed.lines.iter().map(|l| ('+', l.as_str())));
        prev = Some(chunk);
    }
    if let Some(last) = prev {
        body.extend(last.post_context.iter().map(|l| (' ', l.as_str())));
    }

    let original_count = body.iter().filter(|(tag, _)| *tag != '+').count();
    let changed_count = body.iter().filter(|(tag, _)| *tag != '-').count();
    let header_start = |start: usize, count: usize| {
        let start = start.saturating_sub(first.pre_context.len());
        if count == 0 {
            start.saturating_sub(1)
        } else {
            start
        }
    };

    out.push_str(&format!(
        "@@ -{},{} +{},{} @@\n",
        header_start(first.original.start, original_count),
        original_count,
        header_start(first.changed.start, changed_count),
        changed_count
    ));
    for (tag, line) in body {
        push_line(out, tag, line);
    }
}

pub fn render_hunk(chunks: &[Chunk]) -> String {
    let mut out = String::new();
    write_hunk(chunks, &mut out);
    out
}
