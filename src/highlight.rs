//! Per-line syntax classification and markup generation.
//!
//! Takes one raw formatted line and produces a marked-up string the host
//! paints. Stages build on each other in a fixed order: escaping, string
//! span classification, literal classification, optional whitespace
//! markers, bracket tagging, collapsed-region badges, and finally the
//! search-match overlay. Later stages never break the span boundaries of
//! earlier ones; anything unrecognized passes through as plain text.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::brackets::{BracketLevelMap, BracketSpan};
use crate::regions::{RegionKind, RegionMap};
use crate::search::SearchMode;

const QUOTE: &str = "&quot;";
const WS_DOT: &str = "<span class=\"whitespace-dot\"></span>";
const WS_TAB: &str = "<span class=\"whitespace-tab\"></span>";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\b\d+(?:\.\d+)?\b").unwrap());
static BOOLEAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(true|false)\b").unwrap());
static NULL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bnull\b").unwrap());
static CLASSIFIED_SPAN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<span class="(json-key|json-string|json-number|json-boolean|json-null)">([^<]+)</span>"#)
        .unwrap()
});

/// Display toggles consumed by the highlighter, a slice of the behavior
/// settings relevant to markup generation.
#[derive(Debug, Clone)]
pub struct HighlightOptions {
    pub rainbow_brackets: bool,
    pub show_whitespace: bool,
    pub show_data_types: bool,
    pub show_string_length: bool,
    pub string_length_threshold: usize,
    pub highlight_matches: bool,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        HighlightOptions {
            rainbow_brackets: false,
            show_whitespace: false,
            show_data_types: true,
            show_string_length: false,
            string_length_threshold: 20,
            highlight_matches: true,
        }
    }
}

/// Active search overlay parameters for the final highlighting stage.
#[derive(Debug, Clone, Copy)]
pub struct SearchOverlay<'a> {
    pub query: &'a str,
    pub mode: SearchMode,
    /// When the navigation cursor's match sits on this line, its index
    /// among the line's matches in left-to-right order. That match's
    /// highlight spans get an extra `current` class.
    pub current: Option<usize>,
}

/// Produce the markup for one line.
///
/// `brackets` is consulted only in rainbow mode; `search` is applied only
/// when a query is active and `highlight_matches` is on.
pub fn highlight_line(
    line: &str,
    line_number: usize,
    regions: &RegionMap,
    brackets: &BracketLevelMap,
    search: Option<SearchOverlay<'_>>,
    opts: &HighlightOptions,
) -> String {
    let escaped = escape_markup(line);
    let mut markup = classify_line(&escaped, opts);

    if opts.show_whitespace {
        markup = visualize_leading_whitespace(&markup);
        markup = visualize_punctuation_spaces(&markup);
    }

    markup = tag_brackets(&markup, brackets.get(&line_number), opts.rainbow_brackets);

    if opts.show_data_types
        && let Some(region) = regions.get(&line_number)
        && region.collapsed
    {
        markup = insert_region_badge(&markup, region.kind, region.item_count);
    }

    if opts.highlight_matches
        && let Some(overlay) = search
        && !overlay.query.is_empty()
    {
        markup = overlay_search_matches(&markup, overlay.query, overlay.mode, overlay.current);
    }

    markup
}

/// Escape a raw line for embedding in markup. Quotes are escaped
/// explicitly: the string-span scan below keys off `&quot;` delimiters.
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Wrap quoted strings in key/string spans and classify the literals in
/// the text between them.
fn classify_line(escaped: &str, opts: &HighlightOptions) -> String {
    let quote_positions: Vec<usize> = escaped.match_indices(QUOTE).map(|(i, _)| i).collect();

    let mut result = String::with_capacity(escaped.len() + 64);
    let mut last_end = 0;
    let mut idx = 0;

    // Pair up quote delimiters non-greedily, left to right. An unpaired
    // trailing quote falls through to the literal classifier as-is.
    while idx + 1 < quote_positions.len() {
        let start = quote_positions[idx];
        let end = quote_positions[idx + 1] + QUOTE.len();

        result.push_str(&classify_literals(&escaped[last_end..start]));

        let content = &escaped[start + QUOTE.len()..end - QUOTE.len()];
        let is_key = escaped[end..].trim_start().starts_with(':');

        if is_key {
            result.push_str(&format!(
                "<span class=\"json-key\">{QUOTE}{content}{QUOTE}</span>"
            ));
        } else {
            result.push_str(&format!(
                "<span class=\"json-string\">{QUOTE}{content}{QUOTE}</span>"
            ));
            if opts.show_string_length {
                let length = unescaped_char_count(content);
                if length > opts.string_length_threshold {
                    result.push_str(&format!(
                        "<span class=\"string-length-badge\">{length} chars</span>"
                    ));
                }
            }
        }

        last_end = end;
        idx += 2;
    }

    result.push_str(&classify_literals(&escaped[last_end..]));
    result
}

/// Classify numbers, booleans, and null in non-string text.
fn classify_literals(text: &str) -> String {
    let text = NUMBER_RE.replace_all(text, "<span class=\"json-number\">${0}</span>");
    let text = BOOLEAN_RE.replace_all(&text, "<span class=\"json-boolean\">${0}</span>");
    NULL_RE
        .replace_all(&text, "<span class=\"json-null\">null</span>")
        .into_owned()
}

/// Character count of a string value as the user typed it.
fn unescaped_char_count(content: &str) -> usize {
    content
        .replace(QUOTE, "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .chars()
        .count()
}

/// Replace the leading indentation run with visible marker spans.
fn visualize_leading_whitespace(markup: &str) -> String {
    let rest = markup.trim_start_matches([' ', '\t']);
    let lead_len = markup.len() - rest.len();
    if lead_len == 0 {
        return markup.to_string();
    }

    let mut out = String::with_capacity(markup.len() + lead_len * WS_DOT.len());
    for ch in markup[..lead_len].chars() {
        out.push_str(if ch == '\t' { WS_TAB } else { WS_DOT });
    }
    out.push_str(rest);
    out
}

/// Replace spaces that follow structural punctuation with marker spans.
/// Runs only on text outside spans, so string content is never touched.
fn visualize_punctuation_spaces(markup: &str) -> String {
    let chars: Vec<char> = markup.chars().collect();
    let mut out = String::with_capacity(markup.len());
    let mut depth: usize = 0;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if ch == '<' {
            let closing = chars.get(i + 1) == Some(&'/');
            while i < chars.len() {
                out.push(chars[i]);
                if chars[i] == '>' {
                    i += 1;
                    break;
                }
                i += 1;
            }
            if closing {
                depth = depth.saturating_sub(1);
            } else {
                depth += 1;
            }
            continue;
        }

        out.push(ch);
        i += 1;

        if depth == 0 && matches!(ch, ':' | ',' | '[' | ']' | '{' | '}') {
            while i < chars.len() && (chars[i] == ' ' || chars[i] == '\t') {
                out.push_str(if chars[i] == '\t' { WS_TAB } else { WS_DOT });
                i += 1;
            }
        }
    }

    out
}

/// Wrap each bracket character in a tagged span, left to right.
///
/// In rainbow mode one BracketSpan is consumed per bracket occurrence, in
/// order, mirroring how the level calculator scanned the raw line. If the
/// spans run out the bracket passes through untagged.
fn tag_brackets(markup: &str, spans: Option<&Vec<BracketSpan>>, rainbow: bool) -> String {
    let mut out = String::with_capacity(markup.len() + 64);
    let mut in_tag = false;
    let mut consumed = 0;

    for ch in markup.chars() {
        if in_tag {
            out.push(ch);
            if ch == '>' {
                in_tag = false;
            }
            continue;
        }

        match ch {
            '<' => {
                in_tag = true;
                out.push(ch);
            }
            '{' | '}' | '[' | ']' => {
                let class = if ch == '{' || ch == '}' {
                    "json-object-bracket"
                } else {
                    "json-array-bracket"
                };

                if rainbow {
                    if let Some(spans) = spans
                        && consumed < spans.len()
                    {
                        let level = spans[consumed].palette_index();
                        consumed += 1;
                        out.push_str(&format!(
                            "<span class=\"{class} bracket-level-{level}\">{ch}</span>"
                        ));
                    } else {
                        out.push(ch);
                    }
                } else {
                    out.push_str(&format!("<span class=\"{class}\">{ch}</span>"));
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Insert a `[N]`/`{N}` badge right after the opening bracket's span on a
/// collapsed region's start line.
fn insert_region_badge(markup: &str, kind: RegionKind, item_count: usize) -> String {
    let (open_char, badge_class, badge_text) = match kind {
        RegionKind::Array => ('[', "array-badge", format!("[{item_count}]")),
        RegionKind::Object => ('{', "object-badge", format!("{{{item_count}}}")),
    };

    let anchor = format!(">{open_char}</span>");
    let Some(pos) = markup.find(&anchor) else {
        return markup.to_string();
    };
    let insert_at = pos + anchor.len();

    let mut out = String::with_capacity(markup.len() + 48);
    out.push_str(&markup[..insert_at]);
    out.push_str(&format!(
        "<span class=\"type-badge {badge_class}\">{badge_text}</span>"
    ));
    out.push_str(&markup[insert_at..]);
    out
}

/// Overlay search-match highlighting inside the span classes selected by
/// the search mode. This is the outermost transform; it nests highlight
/// spans inside the classified spans without moving their boundaries.
///
/// Matching spans are numbered left to right; the one at `current` gets
/// an extra `current` class so the host can style the navigation target.
fn overlay_search_matches(
    markup: &str,
    query: &str,
    mode: SearchMode,
    current: Option<usize>,
) -> String {
    let Ok(query_re) = RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    else {
        return markup.to_string();
    };

    let mut match_index = 0;
    CLASSIFIED_SPAN_RE
        .replace_all(markup, |caps: &regex::Captures<'_>| {
            let class = caps.get(1).map_or("", |m| m.as_str());
            let content = caps.get(2).map_or("", |m| m.as_str());

            let participates = match mode {
                SearchMode::Key => class == "json-key",
                SearchMode::Value => class != "json-key",
                SearchMode::Both => true,
            };
            if !participates {
                return caps[0].to_string();
            }

            let quoted = class == "json-key" || class == "json-string";
            let inner = if quoted {
                content
                    .strip_prefix(QUOTE)
                    .and_then(|s| s.strip_suffix(QUOTE))
                    .unwrap_or(content)
            } else {
                content
            };

            if !query_re.is_match(inner) {
                return caps[0].to_string();
            }

            let highlight_class = if current == Some(match_index) {
                "search-highlight current"
            } else {
                "search-highlight"
            };
            match_index += 1;

            let replacement = format!("<span class=\"{highlight_class}\">${{0}}</span>");
            let highlighted = query_re.replace_all(inner, replacement.as_str());
            if quoted {
                format!("<span class=\"{class}\">{QUOTE}{highlighted}{QUOTE}</span>")
            } else {
                format!("<span class=\"{class}\">{highlighted}</span>")
            }
        })
        .into_owned()
}
