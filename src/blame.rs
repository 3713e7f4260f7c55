// src/blame.rs

use crate::config::Config;
use crate::error::{BridgeError, BridgeResult};
use crate::model::{asctime, AuthorMeta, AuthorRecord, LineSpan};
use std::collections::HashMap;

/// Id of the record standing in for lines the reformatter made up.
pub const DEFAULT_ID: &str = "reformatter";

const MERGED_ID: &str = "merged";

struct Run {
    id: String,
    span: LineSpan,
}

/// Parses porcelain blame output. Consecutive lines with the same id become
/// one record; metadata blocks for a recurring id are folded together.
pub fn parse_blame(text: &str) -> BridgeResult<Vec<AuthorRecord>> {
    let mut metas: HashMap<String, AuthorMeta> = HashMap::new();
    let mut runs: Vec<Run> = Vec::new();
    let mut lines = text.split_inclusive('\n');

    while let Some(header) = lines.next() {
        if header.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = header.split_whitespace().collect();
        let (id, line) = match fields.as_slice() {
            [id, _original, final_line, ..] => match final_line.parse::<usize>() {
                Ok(line) => (id.to_string(), line),
                Err(_) => return Err(BridgeError::MalformedBlameLine(header.trim_end().to_string())),
            },
            _ => return Err(BridgeError::MalformedBlameLine(header.trim_end().to_string())),
        };

        let meta = metas.entry(id.clone()).or_default();
        let content = loop {
            match lines.next() {
                Some(l) if l.starts_with('\t') => break l[1..].to_string(),
                Some(l) => {
                    let l = l.trim_end_matches(&['\n', '\r'][..]);
                    let (key, value) = l.split_once(' ').unwrap_or((l, ""));
                    meta.set(key, value);
                }
                None => {
                    return Err(BridgeError::MalformedBlameLine(format!(
                        "no content for line {line}"
                    )))
                }
            }
        };

        match runs.last_mut() {
            Some(run) if run.id == id && run.span.end() == line => run.span.lines.push(content),
            _ => runs.push(Run {
                id,
                span: LineSpan::new(line, vec![content]),
            }),
        }
    }

    Ok(runs
        .into_iter()
        .map(|run| AuthorRecord {
            meta: metas.get(&run.id).cloned().unwrap_or_default(),
            id: run.id,
            span: run.span,
        })
        .collect())
}

/// Forward-only view over ascending records.
#[derive(Debug)]
pub struct BlameCursor {
    records: Vec<AuthorRecord>,
    pos: usize,
    floor: usize,
}

impl BlameCursor {
    pub fn new(records: Vec<AuthorRecord>) -> Self {
        BlameCursor {
            records,
            pos: 0,
            floor: 0,
        }
    }

    /// Every record intersecting `[start, end)`. Queries must not reach back
    /// before the end of the previous query, and the records must cover the
    /// whole range.
    pub fn range(&mut self, start: usize, end: usize) -> BridgeResult<&[AuthorRecord]> {
        if start < self.floor {
            return Err(BridgeError::BlameOutOfOrder {
                start,
                floor: self.floor,
            });
        }
        while self.pos < self.records.len() && self.records[self.pos].end() <= start {
            self.pos += 1;
        }
        self.floor = end;
        if end <= start {
            return Ok(&[]);
        }

        let first = self
            .records
            .get(self.pos)
            .filter(|record| record.start() <= start)
            .ok_or(BridgeError::BlameRangeExhausted { line: start })?;
        let mut covered = first.end();
        let mut last = self.pos;
        while covered < end {
            match self.records.get(last + 1) {
                Some(next) if next.start() == covered => {
                    covered = next.end();
                    last += 1;
                }
                _ => return Err(BridgeError::BlameRangeExhausted { line: covered }),
            }
        }
        Ok(&self.records[self.pos..=last])
    }
}

/// The record used for lines no original line contributed to.
pub fn default_record(config: &Config) -> AuthorRecord {
    AuthorRecord {
        id: DEFAULT_ID.to_string(),
        span: LineSpan::default(),
        meta: AuthorMeta {
            author: "blame-bridge".to_string(),
            author_mail: "<blame-bridge@example.com>".to_string(),
            author_time: config.reformat_time,
            author_tz: "Z".to_string(),
            committer_time: Some(config.reformat_time),
            summary: "Whitespace added by reformatter".to_string(),
            ..AuthorMeta::default()
        },
    }
}

/// Collapses several records into one. A single distinct id is returned
/// as is; otherwise a synthesized record names every constituent.
pub fn merge_records(records: &[AuthorRecord], config: &Config) -> AuthorRecord {
    let mut unique: Vec<&AuthorRecord> = Vec::new();
    for record in records {
        if !unique.iter().any(|r| r.id == record.id) {
            unique.push(record);
        }
    }
    if let [only] = unique.as_slice() {
        return (*only).clone();
    }

    unique.sort_by(|a, b| a.id.cmp(&b.id));
    let mut id = MERGED_ID.to_string();
    let mut summary = "Ambiguous attribution after reformat\n\n".to_string();
    for record in &unique {
        id.push('-');
        id.push_str(&record.id);
        summary.push_str(&record.header(true));
    }

    unique.sort_by_key(|record| record.start());
    let start = unique.first().map_or(0, |record| record.start());
    let lines = unique
        .iter()
        .flat_map(|record| record.span.lines.iter().cloned())
        .collect();

    let mut merged = default_record(config);
    merged.id = id;
    merged.span = LineSpan::new(start, lines);
    merged.meta.summary = summary.trim_end().to_string();
    merged
}

/// Notes the reformat in the record's summary.
pub fn augment(record: &AuthorRecord, config: &Config) -> AuthorRecord {
    let mut augmented = record.clone();
    augmented.meta.summary = format!(
        "{}\nReformatted {}; original {}",
        record.meta.summary,
        asctime(config.reformat_time),
        record.id
    );
    augmented
}

/// The record with the latest commit time; the earliest one wins ties.
pub fn pick_newest<'a, I>(records: I) -> Option<&'a AuthorRecord>
where
    I: IntoIterator<Item = &'a AuthorRecord>,
{
    records.into_iter().fold(None, |newest, record| match newest {
        Some(n) if n.commit_time() >= record.commit_time() => Some(n),
        _ => Some(record),
    })
}

/// Owner of an absolute original line among records sorted by line.
pub fn find_owner(records: &[AuthorRecord], line: usize) -> BridgeResult<&AuthorRecord> {
    records
        .iter()
        .find(|record| line < record.end())
        .ok_or(BridgeError::BlameRangeExhausted { line })
}
