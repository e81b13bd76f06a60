//! Per-tab document state.
//!
//! A [`Tab`] owns one loaded document: the raw text, the parsed value (or
//! a parse error when the text is not JSON), the formatted lines, and the
//! derived region/bracket maps. Every derived map is recomputed on a
//! content change; collapse flags survive via the region merge, and a
//! generation counter lets superseded progressive renders be discarded
//! instead of racing the new content.

use std::path::PathBuf;

use log::{debug, info};
use serde_json::Value;

use crate::brackets::{self, BracketLevelMap};
use crate::format::{self, DEFAULT_INDENT};
use crate::highlight::HighlightOptions;
use crate::parse_error::ParseError;
use crate::regions::{self, RegionMap};
use crate::render::{
    Debouncer, ProgressiveChunk, ProgressiveRender, RenderContext, RenderOutput, RenderStrategy,
    Viewport, PROGRESSIVE_CHUNK, SCROLL_DEBOUNCE,
};
use crate::search::{SearchMatch, SearchMode, SearchState};

/// Stable tab identity, never reused within a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

/// What an external loader hands the core.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub raw_text: String,
    pub display_name: String,
    pub source_path: Option<PathBuf>,
}

/// One open document with its derived render state.
#[derive(Debug)]
pub struct Tab {
    pub id: TabId,
    pub title: String,
    pub source_path: Option<PathBuf>,
    pub raw_text: String,
    pub value: Option<Value>,
    pub parse_error: Option<ParseError>,
    pub lines: Vec<String>,
    pub regions: RegionMap,
    pub brackets: BracketLevelMap,
    pub search: SearchState,
    pub strategy: RenderStrategy,
    pub viewport: Viewport,
    generation: u64,
    progressive: Option<ProgressiveRender>,
    scroll_debounce: Debouncer,
}

impl Tab {
    /// An empty tab with nothing loaded.
    pub fn new(id: TabId) -> Tab {
        Tab {
            id,
            title: "Untitled".to_string(),
            source_path: None,
            raw_text: String::new(),
            value: None,
            parse_error: None,
            lines: Vec::new(),
            regions: RegionMap::new(),
            brackets: BracketLevelMap::new(),
            search: SearchState::default(),
            strategy: RenderStrategy::Direct,
            viewport: Viewport::default(),
            generation: 0,
            progressive: None,
            scroll_debounce: Debouncer::new(SCROLL_DEBOUNCE),
        }
    }

    /// Load new content into this tab. On a parse failure the tab keeps
    /// the raw text and records the error; nothing is lost.
    ///
    /// Collapse flags and the active query survive a successful load:
    /// the rebuild carries flags forward by start line and re-runs the
    /// query against the new lines.
    pub fn load(&mut self, request: LoadRequest, indent: usize) {
        self.title = request.display_name;
        self.source_path = request.source_path;
        self.raw_text = request.raw_text;

        match serde_json::from_str::<Value>(&self.raw_text) {
            Ok(value) => {
                info!("loaded {} ({} bytes)", self.title, self.raw_text.len());
                self.parse_error = None;
                self.value = Some(value);
                self.rebuild(indent);
            }
            Err(e) => {
                let error = ParseError::from_serde_error(&e, &self.raw_text, &self.title);
                info!("parse failed for {}: {}", self.title, error.message);
                self.parse_error = Some(error);
                self.value = None;
                self.lines.clear();
                self.regions.clear();
                self.brackets.clear();
                self.search.clear();
                self.strategy = RenderStrategy::Direct;
                self.generation += 1;
                self.progressive = None;
            }
        }
    }

    /// Reformat and recompute every derived map from the parsed value.
    /// Collapse flags carry over for regions that keep their start line.
    fn rebuild(&mut self, indent: usize) {
        let Some(value) = &self.value else { return };

        let text = format::format_value(value, indent);
        self.lines = format::split_lines(&text);

        let mut fresh = regions::build_region_map(&self.lines);
        regions::merge_collapsed(&mut fresh, &self.regions);
        self.regions = fresh;
        self.brackets = brackets::calculate_bracket_levels(&self.lines);

        self.strategy = RenderStrategy::select(self.lines.len());
        self.generation += 1;
        self.progressive = match self.strategy {
            RenderStrategy::Progressive => {
                Some(ProgressiveRender::new(self.lines.len(), self.generation))
            }
            _ => None,
        };
        debug!(
            "rebuilt {}: {} lines, {} regions, {:?}",
            self.title,
            self.lines.len(),
            self.regions.len(),
            self.strategy
        );

        if !self.search.query.is_empty() {
            let query = self.search.query.clone();
            let mode = self.search.mode;
            self.search.run(&self.lines, &query, mode);
        }
    }

    /// Re-serialize at the given indent width.
    pub fn reformat(&mut self, indent: usize) {
        self.rebuild(indent);
    }

    /// Re-serialize with no whitespace at all.
    pub fn minify(&mut self) {
        self.rebuild(0);
    }

    /// Check the raw text without touching any state.
    pub fn validate(&self) -> Result<(), ParseError> {
        match serde_json::from_str::<Value>(&self.raw_text) {
            Ok(_) => Ok(()),
            Err(e) => Err(ParseError::from_serde_error(&e, &self.raw_text, &self.title)),
        }
    }

    pub fn has_document(&self) -> bool {
        self.value.is_some()
    }

    /// Flip one region's collapse flag. Returns false when no region
    /// starts at the line. Derived maps are untouched; the caller patches
    /// the affected line range only.
    pub fn toggle_region(&mut self, start_line: usize) -> bool {
        match self.regions.get_mut(&start_line) {
            Some(region) => {
                region.collapsed = !region.collapsed;
                true
            }
            None => false,
        }
    }

    pub fn expand_all(&mut self) -> bool {
        regions::expand_all(&mut self.regions)
    }

    pub fn collapse_all(&mut self) -> bool {
        regions::collapse_all(&mut self.regions)
    }

    /// Run a search over the formatted lines.
    pub fn search(&mut self, query: &str, mode: SearchMode) -> usize {
        self.search.run(&self.lines, query, mode);
        self.search.matches.len()
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    /// Step to the next match, expanding any collapsed region hiding it.
    pub fn search_next(&mut self) -> Option<SearchMatch> {
        let m = self.search.next()?.clone();
        regions::expand_to_line(&mut self.regions, m.line_number);
        Some(m)
    }

    /// Step to the previous match, expanding any collapsed region hiding
    /// it.
    pub fn search_previous(&mut self) -> Option<SearchMatch> {
        let m = self.search.previous()?.clone();
        regions::expand_to_line(&mut self.regions, m.line_number);
        Some(m)
    }

    /// Record a scroll/resize event; the actual window recompute waits
    /// for the debounce delay.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.scroll_debounce.poke();
    }

    /// True once per scroll burst, once the debounce delay has passed.
    pub fn viewport_render_due(&mut self) -> bool {
        self.scroll_debounce.ready()
    }

    fn context<'a>(&'a self, options: &'a HighlightOptions) -> RenderContext<'a> {
        let search = (!self.search.query.is_empty()).then_some(&self.search);
        RenderContext::new(&self.lines, &self.regions, &self.brackets, options, search)
    }

    /// Render per the current strategy: the whole document for Direct,
    /// the buffered viewport window for Virtualized. Progressive tabs
    /// render via [`progressive_chunk`](Tab::progressive_chunk) instead;
    /// calling this on one emits only the first chunk synchronously, so
    /// a large document never blocks the caller.
    pub fn render(&self, options: &HighlightOptions) -> RenderOutput {
        let ctx = self.context(options);
        match self.strategy {
            RenderStrategy::Direct => ctx.render_direct(),
            RenderStrategy::Progressive => ctx.render_range(1, PROGRESSIVE_CHUNK),
            RenderStrategy::Virtualized => crate::render::render_window(&ctx, self.viewport),
        }
    }

    /// Render just the line range of one toggled region.
    pub fn render_region_patch(
        &self,
        start_line: usize,
        options: &HighlightOptions,
    ) -> Option<RenderOutput> {
        self.context(options).region_patch(start_line)
    }

    /// Produce the next progressive chunk, or None when the render is
    /// finished or was superseded by a newer content generation.
    pub fn progressive_chunk(&mut self, options: &HighlightOptions) -> Option<ProgressiveChunk> {
        let mut render = self.progressive.take()?;
        if render.generation() != self.generation {
            debug!("dropping superseded progressive render for {}", self.title);
            return None;
        }

        let chunk = {
            let ctx = self.context(options);
            render.next_chunk(&ctx)
        };
        if !render.is_done() {
            self.progressive = Some(render);
        }
        chunk
    }
}

/// Convenience for loading into a fresh tab at the default indent.
pub fn load_tab(id: TabId, request: LoadRequest) -> Tab {
    let mut tab = Tab::new(id);
    tab.load(request, DEFAULT_INDENT);
    tab
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loaded(value: serde_json::Value) -> Tab {
        load_tab(
            TabId(1),
            LoadRequest {
                raw_text: value.to_string(),
                display_name: "test.json".to_string(),
                source_path: None,
            },
        )
    }

    #[test]
    fn test_load_builds_all_derived_state() {
        let tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));

        assert!(tab.has_document());
        assert!(tab.parse_error.is_none());
        assert_eq!(tab.lines.len(), 8);
        assert_eq!(tab.regions.len(), 2);
        assert!(!tab.brackets.is_empty());
        assert_eq!(tab.strategy, RenderStrategy::Direct);
    }

    #[test]
    fn test_invalid_json_keeps_raw_text() {
        let mut tab = Tab::new(TabId(1));
        tab.load(
            LoadRequest {
                raw_text: "{broken".to_string(),
                display_name: "bad.json".to_string(),
                source_path: None,
            },
            DEFAULT_INDENT,
        );

        assert!(!tab.has_document());
        assert_eq!(tab.raw_text, "{broken");
        let error = tab.parse_error.as_ref().unwrap();
        assert_eq!(error.display_name, "bad.json");
        assert!(tab.validate().is_err());
    }

    #[test]
    fn test_load_carries_collapse_flags_and_query() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        let array_start = *tab
            .regions
            .iter()
            .find(|(_, r)| r.item_count == 3)
            .map(|(line, _)| line)
            .unwrap();
        assert!(tab.toggle_region(array_start));
        assert_eq!(tab.search("b", SearchMode::Key), 1);

        // New content with the same line layout: the region that kept
        // its start line stays collapsed and the query re-runs.
        tab.load(
            LoadRequest {
                raw_text: json!({"a": 2, "b": [4, 5, 6]}).to_string(),
                display_name: "next.json".to_string(),
                source_path: None,
            },
            DEFAULT_INDENT,
        );

        assert!(tab.regions[&array_start].collapsed);
        assert_eq!(tab.search.query, "b");
        assert_eq!(tab.search.matches.len(), 1);
    }

    #[test]
    fn test_failed_load_clears_derived_state() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        tab.collapse_all();
        tab.search("b", SearchMode::Key);

        tab.load(
            LoadRequest {
                raw_text: "{broken".to_string(),
                display_name: "bad.json".to_string(),
                source_path: None,
            },
            DEFAULT_INDENT,
        );

        assert!(tab.parse_error.is_some());
        assert!(tab.regions.is_empty());
        assert!(tab.search.query.is_empty());
        assert!(tab.search.matches.is_empty());
    }

    #[test]
    fn test_progressive_render_is_bounded() {
        let tab_value: Vec<u64> = (0..6000).collect();
        let tab = loaded(json!(tab_value));
        assert_eq!(tab.strategy, RenderStrategy::Progressive);

        let output = tab.render(&HighlightOptions::default());
        assert_eq!(output.lines.len(), PROGRESSIVE_CHUNK);
        assert_eq!(output.lines[0].line_number, 1);
    }

    #[test]
    fn test_reformat_preserves_collapse_flags() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        let array_start = *tab
            .regions
            .iter()
            .find(|(_, r)| r.item_count == 3)
            .map(|(line, _)| line)
            .unwrap();
        assert!(tab.toggle_region(array_start));

        tab.reformat(DEFAULT_INDENT);
        assert!(tab.regions[&array_start].collapsed);

        // This document keeps its line layout at indent 4, so the flag
        // carries across the wider reformat too.
        tab.reformat(4);
        assert!(tab.regions[&array_start].collapsed);
    }

    #[test]
    fn test_minify_collapses_to_one_line() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        tab.minify();

        assert_eq!(tab.lines.len(), 1);
        assert!(!tab.lines[0].contains(' '));
        assert!(tab.regions.is_empty());
    }

    #[test]
    fn test_toggle_requires_region_start() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        assert!(!tab.toggle_region(2));
        assert!(tab.toggle_region(1));
        assert!(tab.regions[&1].collapsed);
    }

    #[test]
    fn test_expand_and_collapse_all() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));

        assert!(tab.collapse_all());
        assert!(tab.regions.values().all(|r| r.collapsed));
        assert!(!tab.collapse_all());
        assert!(tab.expand_all());
        assert!(tab.regions.values().all(|r| !r.collapsed));
    }

    #[test]
    fn test_search_navigation_expands_regions() {
        let mut tab = loaded(json!({"a": 1, "b": {"c": 2}}));
        tab.collapse_all();

        assert_eq!(tab.search("2", SearchMode::Value), 1);
        let m = tab.search_next().unwrap();

        // The match sits inside the array; stepping to it expands every
        // region hiding that line.
        assert!(!crate::regions::is_line_hidden(&tab.regions, m.line_number));
    }

    #[test]
    fn test_search_survives_reformat() {
        let mut tab = loaded(json!({"a": 1, "b": [1, 2, 3]}));
        tab.search("b", SearchMode::Key);
        assert_eq!(tab.search.matches.len(), 1);

        tab.reformat(4);
        assert_eq!(tab.search.matches.len(), 1);
    }

    #[test]
    fn test_progressive_generation_guard() {
        let tab_value: Vec<u64> = (0..6000).collect();
        let mut tab = loaded(json!(tab_value));
        assert_eq!(tab.strategy, RenderStrategy::Progressive);

        let options = HighlightOptions::default();
        assert!(tab.progressive_chunk(&options).is_some());

        // A reformat supersedes the in-flight render; its remaining
        // chunks are dropped and a fresh render starts.
        tab.reformat(4);
        let chunk = tab.progressive_chunk(&options).unwrap();
        assert_eq!(chunk.output.lines[0].line_number, 1);
    }

    #[test]
    fn test_virtualized_render_emits_window_only() {
        let tab_value: Vec<u64> = (0..60000).collect();
        let mut tab = loaded(json!(tab_value));
        assert_eq!(tab.strategy, RenderStrategy::Virtualized);

        tab.set_viewport(Viewport { first_visible_line: 500, visible_line_count: 40 });
        let options = HighlightOptions::default();
        let output = tab.render(&options);

        // Window: 10 buffer lines above plus the viewport height plus
        // 20 extra, so 60 lines starting at 490.
        assert_eq!(output.lines.len(), 40 + 20);
        assert_eq!(output.lines[0].line_number, 490);
    }
}
