//! Line-oriented search over formatted JSON text.
//!
//! Matches are found by scanning the formatted lines, not the parsed
//! tree, so positions line up with what the highlighter addresses.
//! Queries are case-insensitive substring matches against key names or
//! value tokens depending on the mode.

use std::sync::LazyLock;

use regex::Regex;

// Heuristic token patterns over formatted output, one token per line at
// standard indents. Scalar values must sit after a colon; a trailing
// boundary (comma, whitespace, closer, or end of line) keeps a number
// match from bleeding into adjacent text.
static KEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)"\s*:"#).unwrap());
static STRING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());
static KEYWORD_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*(true|false|null)").unwrap());
static NUMBER_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*(-?\d+(?:\.\d+)?)").unwrap());

/// What part of the document a search inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    Key,
    Value,
    #[default]
    Both,
}

/// Which side of a key/value pair a match landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Key,
    Value,
}

/// One search hit, addressed by formatted line number (1-based) and byte
/// column within that line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub line_number: usize,
    pub kind: MatchKind,
    pub value: String,
    pub column: usize,
}

/// Scan formatted lines for matches, ordered by line then column.
///
/// Key matches consider only the first `"key":` pattern on each line.
/// Value matches cover quoted strings not followed by a colon, plus
/// boolean/null/number tokens sitting after a colon.
pub fn find_matches(lines: &[String], query: &str, mode: SearchMode) -> Vec<SearchMatch> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut matches = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let line_number = i + 1;
        let mut line_matches = Vec::new();

        if mode != SearchMode::Value
            && let Some(caps) = KEY_RE.captures(line)
            && let Some(key) = caps.get(1)
            && key.as_str().to_lowercase().contains(&needle)
        {
            line_matches.push(SearchMatch {
                line_number,
                kind: MatchKind::Key,
                value: key.as_str().to_string(),
                column: key.start(),
            });
        }

        if mode != SearchMode::Key {
            collect_value_matches(line, line_number, &needle, &mut line_matches);
        }

        line_matches.sort_by_key(|m| m.column);
        matches.extend(line_matches);
    }
    matches
}

fn collect_value_matches(
    line: &str,
    line_number: usize,
    needle: &str,
    out: &mut Vec<SearchMatch>,
) {
    // Quoted strings that are values, not keys.
    for caps in STRING_RE.captures_iter(line) {
        let Some(content) = caps.get(1) else { continue };
        let Some(whole) = caps.get(0) else { continue };
        if line[whole.end()..].trim_start().starts_with(':') {
            continue;
        }
        if content.as_str().to_lowercase().contains(needle) {
            out.push(SearchMatch {
                line_number,
                kind: MatchKind::Value,
                value: content.as_str().to_string(),
                column: content.start(),
            });
        }
    }

    for re in [&*KEYWORD_VALUE_RE, &*NUMBER_VALUE_RE] {
        for caps in re.captures_iter(line) {
            let Some(token) = caps.get(1) else { continue };
            if !boundary_after(line, token.end()) {
                continue;
            }
            if token.as_str().to_lowercase().contains(needle) {
                out.push(SearchMatch {
                    line_number,
                    kind: MatchKind::Value,
                    value: token.as_str().to_string(),
                    column: token.start(),
                });
            }
        }
    }
}

/// A scalar token ends at a comma, whitespace, closing bracket, or the
/// end of the line.
fn boundary_after(line: &str, end: usize) -> bool {
    match line[end..].chars().next() {
        None => true,
        Some(c) => c == ',' || c == ']' || c == '}' || c.is_whitespace(),
    }
}

/// Current query, its matches, and the cyclic navigation cursor.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: String,
    pub mode: SearchMode,
    pub matches: Vec<SearchMatch>,
    pub current: Option<usize>,
}

impl SearchState {
    /// Run a query against the formatted lines. An empty query clears
    /// results and cursor.
    pub fn run(&mut self, lines: &[String], query: &str, mode: SearchMode) {
        self.query = query.to_string();
        self.mode = mode;
        self.matches = find_matches(lines, query, mode);
        self.current = if self.matches.is_empty() { None } else { Some(0) };
    }

    pub fn clear(&mut self) {
        self.query.clear();
        self.matches.clear();
        self.current = None;
    }

    /// Advance the cursor, wrapping past the last match.
    pub fn next(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let idx = match self.current {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.current = Some(idx);
        self.matches.get(idx)
    }

    /// Move the cursor back, wrapping before the first match.
    pub fn previous(&mut self) -> Option<&SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let idx = match self.current {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.current = Some(idx);
        self.matches.get(idx)
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.current.and_then(|i| self.matches.get(i))
    }

    /// Line numbers that hold at least one match, for per-line overlay
    /// decisions during rendering.
    pub fn matched_lines(&self) -> std::collections::HashSet<usize> {
        self.matches.iter().map(|m| m.line_number).collect()
    }
}
