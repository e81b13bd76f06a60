//! Pleat is the rendering core of a line-oriented JSON viewer.
//!
//! It turns a parsed JSON value into formatted lines, derives collapsible
//! regions and rainbow-bracket levels from them, classifies each line
//! into markup spans, searches keys and values, and picks a render
//! strategy (direct, progressive, or virtualized) sized to the document.
//! The desktop shell feeds it raw text and scroll events and paints the
//! line records it emits.

pub mod brackets;
pub mod document;
pub mod format;
pub mod highlight;
pub mod parse_error;
pub mod regions;
pub mod render;
pub mod search;
pub mod settings;
pub mod workspace;

pub use brackets::{BracketLevelMap, BracketSpan, calculate_bracket_levels};
pub use document::{LoadRequest, Tab, TabId};
pub use format::{DEFAULT_INDENT, format_value, split_lines};
pub use highlight::{HighlightOptions, SearchOverlay, highlight_line};
pub use parse_error::ParseError;
pub use regions::{CollapsibleRegion, RegionKind, RegionMap, build_region_map};
pub use render::{
    GutterRecord, LineRecord, ProgressiveChunk, RenderOutput, RenderStrategy, Viewport,
};
pub use search::{MatchKind, SearchMatch, SearchMode, SearchState};
pub use settings::{Behavior, Colors, Settings};
pub use workspace::Workspace;
