//! Text formatting: serializing a parsed JSON value to indented text.
//!
//! The formatted text is the addressing scheme for everything else in the
//! crate: regions, bracket levels, and search matches are all keyed by the
//! 1-based line numbers of this output.

use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde::Serialize;

/// Default indent width, matching the viewer's `indent_size` setting.
pub const DEFAULT_INDENT: usize = 2;

/// Serialize a JSON value with `indent` spaces per nesting level.
///
/// An indent of 0 produces the compact single-line form (the minified
/// serialization). Callers rendering indent-0 output skip region and
/// bracket-level derivation, since both assume one token cluster per line.
pub fn format_value(value: &Value, indent: usize) -> String {
    if indent == 0 {
        return minify_value(value);
    }

    let indent_bytes = vec![b' '; indent];
    let formatter = PrettyFormatter::with_indent(&indent_bytes);
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, formatter);

    // A parsed Value serializing to an in-memory buffer cannot fail.
    if value.serialize(&mut serializer).is_err() {
        return String::new();
    }

    String::from_utf8(out).unwrap_or_default()
}

/// Serialize with no inserted whitespace (the Minify command).
pub fn minify_value(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Split formatted text into the ordered line sequence used for addressing.
/// Line numbers elsewhere in the crate are 1-based indices into this.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(|l| l.to_string()).collect()
}
