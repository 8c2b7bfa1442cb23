//! Makefile-style dependency records (`target: prereq prereq ...`).
//!
//! Compilers emit these with `-MD`/`-MMD -MF <file>`. Rules may span lines
//! with trailing backslashes and paths may contain `\ `-escaped spaces.

use std::path::PathBuf;

/// Every file a compiled object depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencyRecord {
    pub targets: Vec<String>,
    pub prerequisites: Vec<PathBuf>,
}

impl DependencyRecord {
    /// Returns `None` when no rule separator is found.
    pub fn parse(content: &str) -> Option<Self> {
        let mut record = DependencyRecord::default();
        let mut found_rule = false;

        for line in logical_lines(content) {
            let Some(sep) = find_separator(&line) else {
                if line.iter().all(|c| c.is_whitespace()) {
                    continue;
                }
                // Text outside any rule
                return None;
            };
            found_rule = true;
            let (lhs, rhs) = line.split_at(sep);
            record.targets.extend(tokens(lhs));
            record
                .prerequisites
                .extend(tokens(&rhs[1..]).into_iter().map(PathBuf::from));
        }

        found_rule.then_some(record)
    }
}

/// Joins continuation lines; returns each logical line as chars, with
/// escaped spaces kept as `\u{0}` placeholders so tokenizing can't split them.
fn logical_lines(content: &str) -> Vec<Vec<char>> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some('\n') => {
                    chars.next();
                    current.push(' ');
                }
                Some('\r') => {
                    chars.next();
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    current.push(' ');
                }
                Some(' ') => {
                    chars.next();
                    current.push('\u{0}');
                }
                _ => current.push('\\'),
            },
            '\n' => lines.push(std::mem::take(&mut current)),
            '\r' => {}
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// The first `:` that is not a drive letter colon (`C:\...`, `C:/...`).
fn find_separator(line: &[char]) -> Option<usize> {
    (0..line.len()).find(|&i| line[i] == ':' && !is_drive_letter(line, i))
}

/// A lone letter at the start of a token, followed by `:` and a path separator.
fn is_drive_letter(line: &[char], colon: usize) -> bool {
    colon >= 1
        && line[colon - 1].is_ascii_alphabetic()
        && (colon == 1 || line[colon - 2].is_whitespace())
        && matches!(line.get(colon + 1), Some('\\' | '/'))
}

fn tokens(chars: &[char]) -> Vec<String> {
    chars
        .iter()
        .collect::<String>()
        .split_whitespace()
        .map(|t| t.replace('\u{0}', " "))
        .collect()
}
