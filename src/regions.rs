//! Collapsible region mapping over formatted JSON lines.
//!
//! A region is one matched `{...}`/`[...]` pair spanning more than one
//! line. Detection is line-pattern based rather than a full parse, which
//! is sound here because the formatter's own output is predictable (one
//! token cluster per line at standard indents).

use std::collections::BTreeMap;

use log::debug;

/// Container kind for a collapsible region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Object,
    Array,
}

/// A contiguous line range that can be toggled between shown and hidden.
///
/// When collapsed, the lines strictly between `start_line` and `end_line`
/// are hidden; the opening and closing lines stay visible.
#[derive(Debug, Clone)]
pub struct CollapsibleRegion {
    pub start_line: usize,
    pub end_line: usize,
    pub kind: RegionKind,
    pub collapsed: bool,
    pub indent_level: usize,
    pub item_count: usize,
}

impl CollapsibleRegion {
    /// Number of lines hidden while this region is collapsed.
    pub fn hidden_line_count(&self) -> usize {
        self.end_line - self.start_line - 1
    }
}

/// Region map keyed by start line (one region per qualifying opener).
pub type RegionMap = BTreeMap<usize, CollapsibleRegion>;

/// An open bracket waiting for its closing line.
struct OpenBracket {
    line_number: usize,
    char: char,
    indent_level: usize,
}

/// Scan the formatted lines once and build the map of collapsible regions.
///
/// Closers with no matching opener on the stack are ignored: this is a
/// best-effort detector, not a parser, and the formatter never produces
/// such lines for valid input.
pub fn build_region_map(lines: &[String]) -> RegionMap {
    let mut regions = RegionMap::new();
    let mut stack: Vec<OpenBracket> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        let indent_level = line.len() - line.trim_start().len();

        // Opening brackets that start a multi-line container. Inline
        // containers (opener and closer on the same line) never collapse.
        if trimmed.contains('{') && !is_inline_container(trimmed, '{', '}') {
            stack.push(OpenBracket { line_number, char: '{', indent_level });
        }
        if trimmed.contains('[') && !is_inline_container(trimmed, '[', ']') {
            stack.push(OpenBracket { line_number, char: '[', indent_level });
        }

        // A closing line carries only the closer, optionally with a comma.
        let closing_char = match trimmed {
            "}" | "}," => Some('}'),
            "]" | "]," => Some(']'),
            _ => None,
        };

        let Some(closer) = closing_char else {
            continue;
        };
        let opener_char = if closer == '}' { '{' } else { '[' };

        // Pop the most recent matching opener.
        let Some(pos) = stack.iter().rposition(|open| open.char == opener_char) else {
            debug!("unmatched closer '{}' at line {}", closer, line_number);
            continue;
        };
        let opening = stack.remove(pos);

        // Only regions with at least one interior line are collapsible.
        if line_number > opening.line_number + 1 {
            let kind = if opening.char == '{' {
                RegionKind::Object
            } else {
                RegionKind::Array
            };
            let item_count = count_items(lines, opening.line_number, line_number, kind);

            regions.insert(
                opening.line_number,
                CollapsibleRegion {
                    start_line: opening.line_number,
                    end_line: line_number,
                    kind,
                    collapsed: false,
                    indent_level: opening.indent_level,
                    item_count,
                },
            );
        }
    }

    regions
}

/// Inline container like `{ "key": "value" }` or `[1, 2]` on one line.
fn is_inline_container(trimmed: &str, open: char, close: char) -> bool {
    match (trimmed.find(open), trimmed.find(close)) {
        (Some(open_pos), Some(close_pos)) => open_pos < close_pos,
        _ => false,
    }
}

/// Count the direct children of a region.
///
/// Depth is tracked per bracket character relative to the opener; a line's
/// classification uses the depth at its start. Direct children sit at
/// depth 1: for arrays, lines opening a nested container or carrying a
/// bare primitive; for objects, lines with a `"key":` pattern.
fn count_items(lines: &[String], start_line: usize, end_line: usize, kind: RegionKind) -> usize {
    let mut count = 0;
    let mut depth = 1;

    for line in &lines[start_line..end_line - 1] {
        let trimmed = line.trim();
        let depth_at_start = depth;

        for ch in trimmed.chars() {
            match ch {
                '{' | '[' => depth += 1,
                '}' | ']' => depth -= 1,
                _ => {}
            }
        }

        if depth_at_start != 1 {
            continue;
        }

        match kind {
            RegionKind::Array => {
                if trimmed.starts_with('{')
                    || trimmed.starts_with('[')
                    || is_bare_primitive(trimmed)
                {
                    count += 1;
                }
            }
            RegionKind::Object => {
                if trimmed.contains("\":") {
                    count += 1;
                }
            }
        }
    }

    count
}

/// A line holding a primitive array element: string, number, or literal.
fn is_bare_primitive(trimmed: &str) -> bool {
    trimmed.starts_with('"')
        || trimmed.starts_with('-')
        || trimmed.chars().next().is_some_and(|c| c.is_ascii_digit())
        || trimmed.starts_with("true")
        || trimmed.starts_with("false")
        || trimmed.starts_with("null")
}

/// Carry collapsed flags forward from an older map into a rebuilt one.
///
/// Matching is by start line only: a region whose start line survived a
/// rebuild keeps its collapsed state even if its end line or item count
/// changed.
pub fn merge_collapsed(new_map: &mut RegionMap, old_map: &RegionMap) {
    for (start_line, region) in new_map.iter_mut() {
        if let Some(old) = old_map.get(start_line) {
            region.collapsed = old.collapsed;
        }
    }
}

/// True if `line_number` falls inside any collapsed region's interior.
pub fn is_line_hidden(map: &RegionMap, line_number: usize) -> bool {
    map.values().any(|region| {
        region.collapsed
            && line_number > region.start_line
            && line_number < region.end_line
    })
}

/// Expand every collapsed region whose interior or closing line contains
/// `target_line`, so the line becomes visible. Returns true if anything
/// changed.
pub fn expand_to_line(map: &mut RegionMap, target_line: usize) -> bool {
    let mut expanded = false;
    for region in map.values_mut() {
        if region.collapsed
            && target_line > region.start_line
            && target_line <= region.end_line
        {
            region.collapsed = false;
            expanded = true;
        }
    }
    expanded
}

/// Expand all regions. Returns true if any flag changed.
pub fn expand_all(map: &mut RegionMap) -> bool {
    let mut changed = false;
    for region in map.values_mut() {
        if region.collapsed {
            region.collapsed = false;
            changed = true;
        }
    }
    changed
}

/// Collapse all regions. Returns true if any flag changed.
pub fn collapse_all(map: &mut RegionMap) -> bool {
    let mut changed = false;
    for region in map.values_mut() {
        if !region.collapsed {
            region.collapsed = true;
            changed = true;
        }
    }
    changed
}
