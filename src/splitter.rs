// src/splitter.rs

use crate::blame::{default_record, find_owner, merge_records, pick_newest};
use crate::config::Config;
use crate::diff::render_hunk;
use crate::error::BridgeResult;
use crate::matcher::{align, LineMatch};
use crate::model::{AttributedChunk, AuthorRecord, Chunk};
use tracing::info;

/// The author a single changed line should be credited to.
fn line_author(
    line: &LineMatch,
    origin: usize,
    records: &[AuthorRecord],
    config: &Config,
) -> BridgeResult<AuthorRecord> {
    let owners = line
        .contributors
        .iter()
        .map(|&i| find_owner(records, origin + i))
        .collect::<BridgeResult<Vec<_>>>()?;
    if let Some(owner) = pick_newest(owners) {
        return Ok(owner.clone());
    }

    // Nothing to go on: credit the newest author not yet passed over.
    let position = origin + line.consumed;
    let survivors = records.iter().filter(|record| record.end() > position);
    Ok(pick_newest(survivors)
        .cloned()
        .unwrap_or_else(|| default_record(config)))
}

/// Splits `chunk` at author boundaries. `records` are the blame records
/// overlapping the chunk's original lines, in line order. The pieces
/// partition the chunk: their original and changed lines concatenate back
/// to the input's.
pub fn split_chunk(
    chunk: Chunk,
    records: &[AuthorRecord],
    config: &Config,
) -> BridgeResult<Vec<AttributedChunk>> {
    match records {
        [] => {
            return Ok(vec![AttributedChunk {
                chunk,
                author: default_record(config),
            }])
        }
        [only] => {
            return Ok(vec![AttributedChunk {
                chunk,
                author: only.clone(),
            }])
        }
        _ => {}
    }

    let matches = align(&chunk.original.lines, &chunk.changed.lines, &config.ignore);
    if config.verbosity > 0 && matches.iter().any(|m| m.busted) {
        info!(
            "the following chunk cannot be attributed:\n{}",
            render_hunk(std::slice::from_ref(&chunk))
        );
    }

    let origin = chunk.original.start;
    let mut rest = chunk;
    let mut pieces = Vec::new();
    let mut group: Vec<AuthorRecord> = Vec::new();
    let mut pending = 0;
    let mut taken = 0;
    let mut consumed = 0;
    let mut at_boundary = false;

    for line in &matches {
        let author = line_author(line, origin, records, config)?;
        let known = group.iter().any(|record| record.id == author.id);

        // Only cut where the previous line finished its original lines;
        // otherwise the authors are collapsed into one piece.
        if pending > 0 && !known && at_boundary {
            let piece = rest.take(consumed - taken, pending)?;
            taken = consumed;
            pieces.push(AttributedChunk {
                chunk: piece,
                author: merge_records(&group, config),
            });
            group.clear();
            pending = 0;
        }
        if !group.iter().any(|record| record.id == author.id) {
            group.push(author);
        }
        pending += 1;
        at_boundary = line.complete;
        consumed = line.consumed;
    }

    let author = if group.is_empty() {
        // Nothing but deletions.
        pick_newest(records)
            .cloned()
            .unwrap_or_else(|| default_record(config))
    } else {
        merge_records(&group, config)
    };
    pieces.push(AttributedChunk { chunk: rest, author });

    if config.verbosity > 0 && pieces.len() > 1 {
        info!(
            "split chunk at line {} into {} pieces",
            origin,
            pieces.len()
        );
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AuthorMeta, LineSpan};

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|l| format!("{l}\n")).collect()
    }

    fn record(id: &str, start: usize, content: &[&str], time: i64) -> AuthorRecord {
        AuthorRecord {
            id: id.to_string(),
            span: LineSpan::new(start, lines(content)),
            meta: AuthorMeta {
                author: id.to_string(),
                author_mail: format!("<{id}@example.com>"),
                author_time: time,
                committer_time: Some(time),
                summary: format!("commit {id}"),
                ..AuthorMeta::default()
            },
        }
    }

    fn chunk(start: usize, original: &[&str], changed: &[&str]) -> Chunk {
        Chunk::new(
            LineSpan::new(start, lines(original)),
            LineSpan::new(start, lines(changed)),
            lines(&["before"]),
            lines(&["after"]),
        )
    }

    fn config() -> Config {
        Config {
            reformat_time: 10_000,
            ..Config::default()
        }
    }

    fn summary(pieces: &[AttributedChunk]) -> Vec<(String, Vec<String>, Vec<String>)> {
        pieces
            .iter()
            .map(|p| {
                (
                    p.author.id.clone(),
                    p.chunk.original.lines.clone(),
                    p.chunk.changed.lines.clone(),
                )
            })
            .collect()
    }

    fn assert_partition(input: &Chunk, pieces: &[AttributedChunk]) {
        let original: Vec<String> = pieces
            .iter()
            .flat_map(|p| p.chunk.original.lines.clone())
            .collect();
        let changed: Vec<String> = pieces
            .iter()
            .flat_map(|p| p.chunk.changed.lines.clone())
            .collect();
        assert_eq!(original, input.original.lines);
        assert_eq!(changed, input.changed.lines);

        let mut next_original = input.original.start;
        let mut next_changed = input.changed.start;
        for piece in pieces {
            assert_eq!(piece.chunk.original.start, next_original);
            assert_eq!(piece.chunk.changed.start, next_changed);
            next_original = piece.chunk.original.end();
            next_changed = piece.chunk.changed.end();
        }
    }

    #[test]
    fn test_single_author_is_not_split() {
        let c = chunk(1, &["function f(){", "  return 1;", "}"], &["function f(){ return 1; }"]);
        let records = vec![record("a1", 1, &["function f(){", "  return 1;", "}"], 100)];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].author.id, "a1");
        assert_eq!(pieces[0].chunk, c);
    }

    #[test]
    fn test_split_between_authors() {
        let c = chunk(5, &["x=1;", "y=2;"], &["x = 1;", "y = 2;"]);
        let records = vec![
            record("a1", 3, &["p", "q", "x=1;"], 100),
            record("a2", 6, &["y=2;"], 50),
        ];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(
            summary(&pieces),
            vec![
                ("a1".to_string(), lines(&["x=1;"]), lines(&["x = 1;"])),
                ("a2".to_string(), lines(&["y=2;"]), lines(&["y = 2;"])),
            ]
        );
        assert_partition(&c, &pieces);
        assert_eq!(pieces[0].chunk.post_context, lines(&["y=2;", "after"]));
        assert_eq!(pieces[1].chunk.pre_context, lines(&["before", "x=1;"]));
    }

    #[test]
    fn test_joined_line_goes_to_newest_author() {
        let c = chunk(1, &["a(", "b);", "c;"], &["a(b);", "c;"]);
        let records = vec![
            record("old", 1, &["a("], 100),
            record("new", 2, &["b);"], 200),
            record("mid", 3, &["c;"], 150),
        ];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(
            summary(&pieces),
            vec![
                ("new".to_string(), lines(&["a(", "b);"]), lines(&["a(b);"])),
                ("mid".to_string(), lines(&["c;"]), lines(&["c;"])),
            ]
        );
        assert_partition(&c, &pieces);
    }

    #[test]
    fn test_no_safe_cut_collapses_authors() {
        let c = chunk(1, &["ab", "cd"], &["a", "bc", "d"]);
        let records = vec![record("a1", 1, &["ab"], 100), record("a2", 2, &["cd"], 200)];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].author.id, "merged-a1-a2");
        assert!(pieces[0].author.meta.summary.contains("From: a1 <a1@example.com>"));
        assert_partition(&c, &pieces);
    }

    #[test]
    fn test_busted_lines_fall_back_to_newest_candidate() {
        let c = chunk(1, &["a;", "x=1;", "y=2;"], &["a ;", "x=2;", "y = 2;"]);
        let records = vec![
            record("a1", 1, &["a;"], 100),
            record("a2", 2, &["x=1;"], 300),
            record("a3", 3, &["y=2;"], 200),
        ];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(
            summary(&pieces),
            vec![
                ("a1".to_string(), lines(&["a;"]), lines(&["a ;"])),
                (
                    "a2".to_string(),
                    lines(&["x=1;", "y=2;"]),
                    lines(&["x=2;", "y = 2;"])
                ),
            ]
        );
        assert_partition(&c, &pieces);
    }

    #[test]
    fn test_blank_line_goes_to_following_author() {
        let c = chunk(1, &["a;", "b;"], &["a ;", "", "b ;"]);
        let records = vec![record("a1", 1, &["a;"], 300), record("a2", 2, &["b;"], 100)];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        assert_eq!(
            summary(&pieces),
            vec![
                ("a1".to_string(), lines(&["a;"]), lines(&["a ;"])),
                ("a2".to_string(), lines(&["b;"]), lines(&["", "b ;"])),
            ]
        );
        assert_partition(&c, &pieces);
    }

    #[test]
    fn test_trailing_blank_line_goes_to_default_author() {
        let c = chunk(1, &["a;", "b;"], &["a ;", "b ;", ""]);
        let records = vec![record("a1", 1, &["a;"], 300), record("a2", 2, &["b;"], 100)];
        let pieces = split_chunk(c.clone(), &records, &config()).unwrap();
        let ids: Vec<_> = pieces.iter().map(|p| p.author.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", crate::blame::DEFAULT_ID]);
        assert!(pieces[2].chunk.original.is_empty());
        assert_partition(&c, &pieces);
    }

    #[test]
    fn test_pure_deletion_goes_to_newest() {
        let c = chunk(1, &["", ""], &[]);
        let records = vec![record("a1", 1, &[""], 100), record("a2", 2, &[""], 200)];
        let pieces = split_chunk(c, &records, &config()).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].author.id, "a2");
    }

    #[test]
    fn test_missing_blame_is_fatal() {
        let c = chunk(7, &["a(", "b);"], &["a(b);"]);
        let records = vec![record("a1", 5, &["q"], 100), record("a2", 6, &["a("], 100)];
        assert!(matches!(
            split_chunk(c, &records, &config()),
            Err(crate::error::BridgeError::BlameRangeExhausted { line: 7 })
        ));
    }
}
