// src/model.rs

use crate::config::CONTEXT_LINES;
use crate::error::{BridgeError, BridgeResult};
use chrono::DateTime;
use std::collections::BTreeMap;

/// A half-open range `[start, end)` of 1-based line numbers together with
/// the text of those lines. Lines keep their terminator, so a final line
/// without a newline is represented faithfully.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineSpan {
    pub start: usize,
    pub lines: Vec<String>,
}

impl LineSpan {
    pub fn new(start: usize, lines: Vec<String>) -> Self {
        LineSpan { start, lines }
    }

    pub fn end(&self) -> usize {
        self.start + self.lines.len()
    }

    pub fn count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Removes the first `n` lines and returns them as a new span,
    /// advancing this span past them.
    pub fn take(&mut self, n: usize) -> BridgeResult<LineSpan> {
        if n > self.lines.len() {
            return Err(BridgeError::InsufficientChunkLines {
                requested: n,
                available: self.lines.len(),
            });
        }
        let rest = self.lines.split_off(n);
        let piece = LineSpan::new(self.start, std::mem::replace(&mut self.lines, rest));
        self.start += n;
        Ok(piece)
    }

    pub fn shift(&mut self, delta: isize) {
        self.start = self.start.saturating_add_signed(delta);
    }
}

fn keep_last(lines: &mut Vec<String>) {
    if lines.len() > CONTEXT_LINES {
        lines.drain(..lines.len() - CONTEXT_LINES);
    }
}

fn keep_first(lines: &mut Vec<String>) {
    lines.truncate(CONTEXT_LINES);
}

/// One contiguous change with up to `CONTEXT_LINES` of unchanged lines on
/// each side. Context is expressed against the file the chunk will be
/// applied to, which starts out as the original file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    pub original: LineSpan,
    pub changed: LineSpan,
    /// Lines immediately preceding `original`, oldest first.
    pub pre_context: Vec<String>,
    /// Lines immediately following `original`.
    pub post_context: Vec<String>,
}

impl Chunk {
    pub fn new(
        original: LineSpan,
        changed: LineSpan,
        mut pre_context: Vec<String>,
        mut post_context: Vec<String>,
    ) -> Self {
        keep_last(&mut pre_context);
        keep_first(&mut post_context);
        Chunk {
            original,
            changed,
            pre_context,
            post_context,
        }
    }

    /// Splits off the first `original` original lines and `changed` changed
    /// lines as a chunk of their own. The remaining original lines become the
    /// trailing context of the piece, and the piece's original lines become
    /// leading context of what is left.
    pub fn take(&mut self, original: usize, changed: usize) -> BridgeResult<Chunk> {
        if changed > self.changed.count() {
            return Err(BridgeError::InsufficientChunkLines {
                requested: changed,
                available: self.changed.count(),
            });
        }
        let taken_original = self.original.take(original)?;
        let taken_changed = self.changed.take(changed)?;

        let post: Vec<String> = self
            .original
            .lines
            .iter()
            .chain(self.post_context.iter())
            .take(CONTEXT_LINES)
            .cloned()
            .collect();
        let piece = Chunk::new(taken_original, taken_changed, self.pre_context.clone(), post);

        self.pre_context.extend(piece.original.lines.iter().cloned());
        keep_last(&mut self.pre_context);
        Ok(piece)
    }

    /// Lines this chunk adds to the file (negative when it removes lines).
    pub fn delta(&self) -> isize {
        self.changed.count() as isize - self.original.count() as isize
    }

    /// First line covered by the chunk including its leading context.
    pub fn window_start(&self) -> usize {
        self.original.start.saturating_sub(self.pre_context.len())
    }

    /// Rewrites this chunk's context as if `applied` had already been applied
    /// to the file. `applied_before` says whether `applied` precedes this chunk
    /// in file order. Line numbers are left alone.
    pub fn update(&mut self, applied: &Chunk, applied_before: bool) {
        if applied_before {
            let window = self.window_start();
            let applied_end = applied.original.end();
            if applied_end > window {
                let from = applied.original.start.saturating_sub(window);
                let to = (applied_end - window).min(self.pre_context.len());
                let from = from.min(to);
                self.pre_context
                    .splice(from..to, applied.changed.lines.iter().cloned());
                keep_last(&mut self.pre_context);
            }
        } else {
            let end = self.original.end();
            let window_end = end + self.post_context.len();
            if applied.original.start < window_end {
                let from = applied.original.start.saturating_sub(end);
                let to = applied
                    .original
                    .end()
                    .saturating_sub(end)
                    .min(self.post_context.len());
                let to = to.max(from);
                self.post_context
                    .splice(from..to, applied.changed.lines.iter().cloned());
                keep_first(&mut self.post_context);
            }
        }
    }

    /// When `next` follows this chunk, how far their context windows overlap.
    /// Positive means the two must be written as one hunk.
    pub fn context_overlap(&self, next: &Chunk) -> isize {
        let end_of_self = (self.original.end() + self.post_context.len()) as isize;
        let start_of_next = next.original.start as isize - next.pre_context.len() as isize;
        end_of_self - start_of_next
    }

    /// Taken on its own, a chunk's changed lines start where its original
    /// lines do.
    pub fn reset_changed_start(&mut self) {
        self.changed.start = self.original.start;
    }
}

/// Metadata attached to an author id by the annotation tool.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorMeta {
    pub author: String,
    pub author_mail: String,
    pub author_time: i64,
    pub author_tz: String,
    pub committer_time: Option<i64>,
    pub summary: String,
    /// Keys we don't interpret, kept so later blocks can augment them.
    pub extra: BTreeMap<String, String>,
}

impl AuthorMeta {
    /// Records one `key value` metadata line. Later values win.
    pub fn set(&mut self, key: &str, value: &str) {
        match key {
            "author" => self.author = value.to_string(),
            "author-mail" => self.author_mail = value.to_string(),
            "author-time" => self.author_time = value.parse().unwrap_or(self.author_time),
            "author-tz" => self.author_tz = value.to_string(),
            "committer-time" => {
                self.committer_time = value.parse().ok().or(self.committer_time)
            }
            "summary" => self.summary = value.to_string(),
            _ => {
                self.extra.insert(key.to_string(), value.to_string());
            }
        }
    }
}

/// A contiguous range of original-file lines attributed to one identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRecord {
    pub id: String,
    pub span: LineSpan,
    pub meta: AuthorMeta,
}

impl AuthorRecord {
    pub fn start(&self) -> usize {
        self.span.start
    }

    pub fn end(&self) -> usize {
        self.span.end()
    }

    /// Time used to decide which of several candidate authors is newest.
    pub fn commit_time(&self) -> i64 {
        self.meta.committer_time.unwrap_or(self.meta.author_time)
    }

    /// Mail-style header introducing a patch from this author. With
    /// `with_commit` the header opens with a `From <id> <date>` line.
    pub fn header(&self, with_commit: bool) -> String {
        let mut header = String::new();
        if with_commit {
            if let Some(committed) = self.meta.committer_time {
                header.push_str(&format!("From {} {}\n", self.id, asctime(committed)));
            }
        }
        header.push_str(&format!(
            "From: {} {}\nDate: {} Z\nSubject: {}\n\n",
            self.meta.author,
            self.meta.author_mail,
            asctime(self.meta.author_time),
            pad_subject(&self.meta.summary)
        ));
        header
    }
}

/// Formats seconds since the epoch like C's `asctime`, in UTC.
pub fn asctime(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%a %b %e %H:%M:%S %Y")
        .to_string()
}

fn pad_subject(summary: &str) -> String {
    summary.replace('\n', "\n  ")
}

/// A chunk believed to come entirely from one author.
#[derive(Debug, Clone)]
pub struct AttributedChunk {
    pub chunk: Chunk,
    pub author: AuthorRecord,
}

/// One author's patch: chunks numbered as if applied on their own.
#[derive(Debug, Clone)]
pub struct PatchArtifact {
    pub author: AuthorRecord,
    pub chunks: Vec<Chunk>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|l| format!("{l}\n")).collect()
    }

    fn chunk(start: usize, original: &[&str], changed: &[&str], pre: &[&str], post: &[&str]) -> Chunk {
        Chunk::new(
            LineSpan::new(start, lines(original)),
            LineSpan::new(start, lines(changed)),
            lines(pre),
            lines(post),
        )
    }

    #[test]
    fn test_span_take_advances_start() {
        let mut span = LineSpan::new(4, lines(&["a", "b", "c"]));
        let piece = span.take(2).unwrap();
        assert_eq!(piece.start, 4);
        assert_eq!(piece.end(), 6);
        assert_eq!(span.start, 6);
        assert_eq!(span.lines, lines(&["c"]));
    }

    #[test]
    fn test_span_take_too_many() {
        let mut span = LineSpan::new(1, lines(&["a"]));
        let err = span.take(2).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::InsufficientChunkLines { requested: 2, available: 1 }
        ));
    }

    #[test]
    fn test_span_shift() {
        let mut span = LineSpan::new(10, lines(&["a"]));
        span.shift(-3);
        assert_eq!((span.start, span.end()), (7, 8));
        span.shift(5);
        assert_eq!(span.start, 12);
    }

    #[test]
    fn test_chunk_context_is_bounded() {
        let c = chunk(10, &["x"], &["y"], &["1", "2", "3", "4"], &["5", "6", "7", "8"]);
        assert_eq!(c.pre_context, lines(&["2", "3", "4"]));
        assert_eq!(c.post_context, lines(&["5", "6", "7"]));
    }

    #[test]
    fn test_chunk_take_moves_context() {
        let mut c = chunk(5, &["a", "b", "c"], &["A", "BC"], &["p"], &["q", "r"]);
        let piece = c.take(1, 1).unwrap();

        assert_eq!(piece.original.lines, lines(&["a"]));
        assert_eq!(piece.changed.lines, lines(&["A"]));
        assert_eq!(piece.pre_context, lines(&["p"]));
        assert_eq!(piece.post_context, lines(&["b", "c", "q"]));

        assert_eq!(c.original.start, 6);
        assert_eq!(c.changed.start, 6);
        assert_eq!(c.pre_context, lines(&["p", "a"]));
        assert_eq!(c.post_context, lines(&["q", "r"]));
    }

    #[test]
    fn test_chunk_take_rejects_missing_changed_lines() {
        let mut c = chunk(5, &["a"], &["A"], &[], &[]);
        assert!(c.take(1, 2).is_err());
        assert_eq!(c.original.count(), 1);
    }

    #[test]
    fn test_update_splices_preceding_change() {
        // `applied` replaces lines 5..7 with one line; this chunk starts at 9
        // with lines 6..9 as leading context.
        let applied = chunk(5, &["e", "f"], &["EF"], &[], &[]);
        let mut c = chunk(9, &["i"], &["I"], &["f", "g", "h"], &[]);
        c.update(&applied, true);
        assert_eq!(c.pre_context, lines(&["EF", "g", "h"]));
    }

    #[test]
    fn test_update_splices_following_change() {
        let mut c = chunk(3, &["c"], &["C"], &[], &["d", "e", "f"]);
        let applied = chunk(5, &["e", "f", "g"], &["E", "F", "G", "H"], &[], &[]);
        c.update(&applied, false);
        assert_eq!(c.post_context, lines(&["d", "E", "F"]));
    }

    #[test]
    fn test_update_ignores_distant_change() {
        let mut c = chunk(20, &["x"], &["X"], &["a", "b", "c"], &["d"]);
        let before = c.clone();
        c.update(&chunk(2, &["k"], &["K"], &[], &[]), true);
        c.update(&chunk(40, &["k"], &["K"], &[], &[]), false);
        assert_eq!(c, before);
    }

    #[test]
    fn test_update_with_insertion_right_before() {
        let applied = chunk(7, &[], &["new"], &[], &[]);
        let mut c = chunk(7, &["g"], &["G"], &["d", "e", "f"], &[]);
        c.update(&applied, true);
        assert_eq!(c.pre_context, lines(&["e", "f", "new"]));
    }

    #[test]
    fn test_context_overlap() {
        let first = chunk(10, &["a", "b"], &["ab"], &[], &["l12", "l13", "l14"]);
        let second = chunk(13, &["d"], &["D"], &["l10", "l11", "l12"], &[]);
        assert_eq!(first.context_overlap(&second), 5);

        let far = chunk(30, &["d"], &["D"], &["x", "y", "z"], &[]);
        assert!(first.context_overlap(&far) <= 0);
    }

    #[test]
    fn test_header_with_commit_line() {
        let mut meta = AuthorMeta::default();
        for (k, v) in [
            ("author", "Ada"),
            ("author-mail", "<ada@example.com>"),
            ("author-time", "0"),
            ("committer-time", "86400"),
            ("summary", "first\nsecond"),
        ] {
            meta.set(k, v);
        }
        let record = AuthorRecord {
            id: "abc".to_string(),
            span: LineSpan::new(1, lines(&["x"])),
            meta,
        };
        assert_eq!(
            record.header(true),
            "From abc Fri Jan  2 00:00:00 1970\n\
             From: Ada <ada@example.com>\n\
             Date: Thu Jan  1 00:00:00 1970 Z\n\
             Subject: first\n  second\n\n"
        );
        assert!(record.header(false).starts_with("From: Ada"));
        assert_eq!(record.commit_time(), 86400);
    }
}
