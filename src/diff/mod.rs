//! Patch parsing and comment anchoring for unified diffs.
//!
//! This module turns a unified-diff patch into rendered rows and maps review
//! comment coordinates onto them:
//! - Row extraction with old/new line numbers (`parse_patch`)
//! - Line classification (Added, Removed, Context, Header, Meta)
//! - Review-comment anchoring by side and line number (`map_line_to_index`)
//! - The reverse mapping used when posting a local comment (`anchor_for_index`)
//! - Splitting multi-file unified diffs into per-file patches

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Represents the type of a line in a diff patch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    /// Line added in the new version (starts with +)
    Added,
    /// Line removed from the old version (starts with -)
    Removed,
    /// Context line, unchanged (starts with space)
    Context,
    /// Hunk header (@@ ... @@)
    Header,
    /// Metadata lines (diff --git, ---, +++, index)
    Meta,
    /// `\ No newline at end of file`
    NoNewline,
}

/// Role of a rendered diff row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

impl LineKind {
    /// The marker a row is rendered with.
    pub fn sign(self) -> char {
        match self {
            LineKind::Added => '+',
            LineKind::Removed => '-',
            LineKind::Context => ' ',
        }
    }
}

/// Which image of the file a review comment's line number refers to.
///
/// Serialized the way GitHub's review-comment API spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Pre-change (old) image
    Left,
    /// Post-change (new) image
    #[default]
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "LEFT",
            Side::Right => "RIGHT",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LEFT" | "OLD" => Ok(Side::Left),
            "RIGHT" | "NEW" => Ok(Side::Right),
            other => Err(format!("invalid side '{}': expected LEFT or RIGHT", other)),
        }
    }
}

/// One rendered row of a diff view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line number in the pre-image (None for added rows)
    pub old_line_number: Option<u32>,
    /// Line number in the post-image (None for removed rows)
    pub new_line_number: Option<u32>,
    /// Row content without the leading diff marker
    pub text: String,
}

impl DiffLine {
    /// The row's line number on the given side, if it has one.
    pub fn line_number(&self, side: Side) -> Option<u32> {
        match side {
            Side::Left => self.old_line_number,
            Side::Right => self.new_line_number,
        }
    }
}

/// Parsed `@@ -old_start,old_count +new_start,new_count @@` header.
///
/// Omitted counts default to 1, as in `diff -u` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

/// Parse a hunk header line.
///
/// Format: `@@ -old_start[,old_count] +new_start[,new_count] @@[ section heading]`
pub fn parse_hunk_header(line: &str) -> Option<HunkHeader> {
    let rest = line.strip_prefix("@@ -")?;
    let (old_range, rest) = rest.split_once(" +")?;
    let (new_range, _) = rest.split_once(" @@")?;

    let (old_start, old_count) = parse_range(old_range)?;
    let (new_start, new_count) = parse_range(new_range)?;

    Some(HunkHeader {
        old_start,
        old_count,
        new_start,
        new_count,
    })
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((parse_digits(start)?, parse_digits(count)?)),
        None => Some((parse_digits(range)?, 1)),
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Classify a line and extract its content without the prefix
pub fn classify_line(line: &str) -> (LineType, &str) {
    if line.starts_with("@@") {
        (LineType::Header, line)
    } else if line.starts_with("+++")
        || line.starts_with("---")
        || line.starts_with("diff --git")
        || line.starts_with("index")
    {
        (LineType::Meta, line)
    } else if line.starts_with('\\') {
        (LineType::NoNewline, line)
    } else if let Some(content) = line.strip_prefix('+') {
        (LineType::Added, content)
    } else if let Some(content) = line.strip_prefix('-') {
        (LineType::Removed, content)
    } else if let Some(content) = line.strip_prefix(' ') {
        (LineType::Context, content)
    } else {
        // Lines without prefix (shouldn't happen in valid patches, but handle gracefully)
        (LineType::Context, line)
    }
}

/// Return the counter's current value and advance it.
fn advance(counter: &mut Option<u32>) -> Option<u32> {
    let current = *counter;
    *counter = current.map(|n| n.saturating_add(1));
    current
}

/// Parse a unified-diff patch into rendered rows.
///
/// Absent or empty input yields no rows. Hunk headers reset the old/new
/// counters and are not emitted; metadata lines are skipped. Any line that
/// does not carry a `+`, `-` or space marker is kept as a context row with its
/// text unmodified, so arbitrary text always parses.
///
/// Rows before the first hunk header have no line numbers.
///
/// Two lines are not rows: the `\ No newline at end of file` marker, which
/// GitHub leaves out of its line numbering (counting it would shift every
/// later row of the hunk by one), and the empty piece after a trailing newline.
pub fn parse_patch(patch: Option<&str>) -> Vec<DiffLine> {
    let Some(patch) = patch.filter(|p| !p.is_empty()) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut old_line: Option<u32> = None;
    let mut new_line: Option<u32> = None;

    for raw in patch.lines() {
        if let Some(header) = parse_hunk_header(raw) {
            old_line = Some(header.old_start);
            new_line = Some(header.new_start);
            continue;
        }

        let (line_type, content) = classify_line(raw);
        let row = match line_type {
            LineType::Meta | LineType::NoNewline => continue,
            LineType::Added => DiffLine {
                kind: LineKind::Added,
                old_line_number: None,
                new_line_number: advance(&mut new_line),
                text: content.to_string(),
            },
            LineType::Removed => DiffLine {
                kind: LineKind::Removed,
                old_line_number: advance(&mut old_line),
                new_line_number: None,
                text: content.to_string(),
            },
            // 壊れた @@ 行は context 扱い
            LineType::Context | LineType::Header => DiffLine {
                kind: LineKind::Context,
                old_line_number: advance(&mut old_line),
                new_line_number: advance(&mut new_line),
                text: content.to_string(),
            },
        };
        rows.push(row);
    }

    rows
}

/// Find the row a review comment anchors to.
///
/// Returns the index of the first row whose line number on `side` equals
/// `line_number`. A context row carries both numbers, so when hunks overlap the
/// earliest row in parse order wins.
pub fn map_line_to_index(lines: &[DiffLine], side: Side, line_number: u32) -> Option<usize> {
    lines
        .iter()
        .position(|line| line.line_number(side) == Some(line_number))
}

/// Remote coordinates for the row at `index`.
///
/// Removed rows anchor on the old image; added and context rows on the new
/// image. Returns `None` for an out-of-range index or a row without a number.
pub fn anchor_for_index(lines: &[DiffLine], index: usize) -> Option<(Side, u32)> {
    let line = lines.get(index)?;
    match line.kind {
        LineKind::Removed => line.old_line_number.map(|n| (Side::Left, n)),
        LineKind::Added | LineKind::Context => line.new_line_number.map(|n| (Side::Right, n)),
    }
}

/// Count (additions, deletions) over parsed rows.
pub fn count_changes(lines: &[DiffLine]) -> (u32, u32) {
    lines
        .iter()
        .fold((0, 0), |(additions, deletions), line| match line.kind {
            LineKind::Added => (additions + 1, deletions),
            LineKind::Removed => (additions, deletions + 1),
            LineKind::Context => (additions, deletions),
        })
}

/// One file's section of a multi-file unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Path in the new tree (old path for deletions), without `a/`/`b/` prefix
    pub filename: String,
    /// Old path when the section is a rename
    pub previous_filename: Option<String>,
    pub new_file: bool,
    pub deleted_file: bool,
    /// Hunk text starting at the first `@@` header.
    /// None for binary files and mode-only changes.
    pub patch: Option<String>,
}

/// Split the output of `git diff` or `gh pr diff` into per-file patches.
///
/// Files keep the order they appear in. The per-file `patch` starts at the
/// first hunk header, matching the shape GitHub's files API returns.
pub fn split_unified_diff(unified_diff: &str) -> Vec<FilePatch> {
    let lines: Vec<&str> = unified_diff.lines().collect();
    let mut files = Vec::new();
    let mut section_start: Option<usize> = None;

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("diff --git ") {
            if let Some(start) = section_start {
                files.extend(parse_file_section(&lines[start..i]));
            }
            section_start = Some(i);
        }
    }

    if let Some(start) = section_start {
        files.extend(parse_file_section(&lines[start..]));
    }

    files
}

fn parse_file_section(section: &[&str]) -> Option<FilePatch> {
    let header = section.first()?;
    let git_filename = extract_filename(header);

    let mut rename_from: Option<String> = None;
    let mut rename_to: Option<String> = None;
    let mut minus_path: Option<String> = None;
    let mut plus_path: Option<String> = None;
    let mut new_file = false;
    let mut deleted_file = false;
    let mut hunk_start: Option<usize> = None;

    for (i, line) in section.iter().enumerate().skip(1) {
        if line.starts_with("@@") {
            hunk_start = Some(i);
            break;
        }
        if line.starts_with("new file mode") {
            new_file = true;
        } else if line.starts_with("deleted file mode") {
            deleted_file = true;
        } else if let Some(from) = line.strip_prefix("rename from ") {
            rename_from = Some(unquote_git_path(from));
        } else if let Some(to) = line.strip_prefix("rename to ") {
            rename_to = Some(unquote_git_path(to));
        } else if let Some(rest) = line.strip_prefix("--- ") {
            if let Some(path) = diff_path(rest) {
                minus_path = Some(path);
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            if let Some(path) = diff_path(rest) {
                plus_path = Some(path);
            }
        }
    }

    // +++ (new name) wins over --- (old name); --- only matters for deletions
    let Some(filename) = rename_to.or(git_filename).or(plus_path).or(minus_path) else {
        warn!("Failed to determine filename for diff section: {}", header);
        return None;
    };

    Some(FilePatch {
        filename,
        previous_filename: rename_from,
        new_file,
        deleted_file,
        patch: hunk_start.map(|start| section[start..].join("\n")),
    })
}

/// Path from a `---`/`+++` line, or None for `/dev/null`.
fn diff_path(rest: &str) -> Option<String> {
    // GNU diff appends a tab and timestamp
    let path = rest.split('\t').next().unwrap_or(rest);
    if path == "/dev/null" {
        return None;
    }
    Some(strip_diff_prefix(&unquote_git_path(path)))
}

/// Decode a C-quoted path as git prints it with `core.quotePath` (the default).
///
/// `"src/\343\201\202.rs"` → `src/あ.rs`. Unquoted input is returned as-is.
fn unquote_git_path(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes: Vec<u8> = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    let mut buf = [0u8; 4];

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('\\') => bytes.push(b'\\'),
            Some('"') => bytes.push(b'"'),
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('r') => bytes.push(b'\r'),
            Some('a') => bytes.push(0x07),
            Some('b') => bytes.push(0x08),
            Some('f') => bytes.push(0x0C),
            Some('v') => bytes.push(0x0B),
            Some(c @ '0'..='7') => {
                // \ooo, 1-3 octal digits
                let mut value = c as u32 - '0' as u32;
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&d @ '0'..='7') => {
                            value = value * 8 + (d as u32 - '0' as u32);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                if let Ok(byte) = u8::try_from(value) {
                    bytes.push(byte);
                }
            }
            Some(c) => {
                bytes.push(b'\\');
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Strip the single-char diff prefix (a/, b/, w/, etc.) from a --- or +++ path.
fn strip_diff_prefix(path: &str) -> String {
    if path.len() >= 2 && path.as_bytes()[1] == b'/' {
        path[2..].to_string()
    } else {
        path.to_string()
    }
}

/// Extract filename from a "diff --git" line
///
/// Handles various formats:
/// - `diff --git a/src/foo.rs b/src/foo.rs` -> `src/foo.rs` (standard prefix)
/// - `diff --git c/src/foo.rs w/src/foo.rs` -> `src/foo.rs` (mnemonicPrefix)
/// - `diff --git a/file with spaces.rs b/file with spaces.rs` -> `file with spaces.rs`
///
/// For renamed files, returns the new filename (from the second path), which
/// is what GitHub reports as `filename`.
///
/// Returns `None` for ambiguous cases (e.g. paths with spaces + subdirs that create
/// false separator matches). Callers fall back to `+++ `/ `--- ` lines.
fn extract_filename(git_diff_line: &str) -> Option<String> {
    let content = git_diff_line.strip_prefix("diff --git ")?;

    // Must start with a single char + '/'
    if content.len() < 2 || content.as_bytes()[1] != b'/' {
        warn!("Failed to parse git diff line: {}", git_diff_line);
        return None;
    }

    let first_prefix = content.as_bytes()[0];
    let first_path = &content[2..];

    // Non-rename: "path1 Y/path2" with path1 == path2,
    // so total length = 2*path_len + 3 (space + Y + /)
    let total_len = first_path.len();
    if total_len >= 3 && (total_len - 3) % 2 == 0 {
        let path_len = (total_len - 3) / 2;
        if path_len > 0 {
            let bytes = first_path.as_bytes();
            if bytes[path_len] == b' ' && bytes[path_len + 2] == b'/' {
                let path1 = &first_path[..path_len];
                let path2 = &first_path[path_len + 3..];
                if path1 == path2 {
                    return Some(path2.to_string());
                }
            }
        }
    }

    // Rename: look for the expected second prefix. Known pairs: a→b, c→w, i→w, o→w.
    let second_prefix = match first_prefix {
        b'a' => b'b',
        b'c' | b'i' | b'o' => b'w',
        _ => {
            warn!(
                "Failed to parse git diff line (unknown prefix): {}",
                git_diff_line
            );
            return None;
        }
    };

    let bytes = first_path.as_bytes();
    let separators: Vec<usize> = (0..bytes.len().saturating_sub(2))
        .filter(|&i| bytes[i] == b' ' && bytes[i + 1] == second_prefix && bytes[i + 2] == b'/')
        .collect();

    // Only an unambiguous single separator is trusted
    if let [sep] = separators.as_slice() {
        let path2 = &first_path[sep + 3..];
        if !path2.is_empty() {
            return Some(path2.to_string());
        }
    }

    None
}
