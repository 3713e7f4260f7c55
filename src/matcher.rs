// src/matcher.rs

use crate::config::IgnoreSet;

/// How one changed line relates to the original lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// Indices into the original lines, in order, that this line draws from.
    pub contributors: Vec<usize>,
    /// The line ends exactly where an original line ends, so the chunk can
    /// be cut after it.
    pub complete: bool,
    /// Original lines fully consumed once this line is matched.
    pub consumed: usize,
    /// Matching gave up at or before this line.
    pub busted: bool,
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Walks `changed` once, greedily eating the original text with ignored
/// characters removed. Once a line cannot be explained by the original
/// text, every line from there on is reported with no contributors.
pub fn align(original: &[String], changed: &[String], ignore: &IgnoreSet) -> Vec<LineMatch> {
    let original: Vec<Vec<char>> = original.iter().map(|line| ignore.strip(line)).collect();
    let mut index = 0;
    let mut offset = 0;
    let mut busted = false;

    changed
        .iter()
        .map(|line| {
            if busted {
                return LineMatch {
                    contributors: Vec::new(),
                    complete: false,
                    consumed: index,
                    busted,
                };
            }

            let line = ignore.strip(line);
            let mut contributors = Vec::new();
            let mut pos = 0;
            loop {
                let Some(current) = original.get(index) else {
                    // Out of original text with some of the line left over.
                    busted = pos < line.len();
                    break;
                };
                let rest = &current[offset..];
                let common = common_prefix(rest, &line[pos..]);
                if common == rest.len() {
                    contributors.push(index);
                    index += 1;
                    offset = 0;
                    pos += common;
                    if pos == line.len() {
                        break;
                    }
                } else {
                    // The formatter changed more than ignorable characters.
                    busted = common < line.len() - pos;
                    if !busted {
                        if common > 0 {
                            contributors.push(index);
                        }
                        offset += common;
                    }
                    break;
                }
            }

            if busted {
                contributors.clear();
            }
            LineMatch {
                contributors,
                complete: !busted && offset == 0,
                consumed: index,
                busted,
            }
        })
        .collect()
}
