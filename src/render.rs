//! Render strategy selection and line-record emission.
//!
//! The strategy is picked purely from the formatted line count. Direct
//! renders classify everything synchronously. Progressive renders hand
//! out bounded chunks that the host schedules between idle ticks.
//! Virtualized renders classify only a buffered window around the
//! viewport, recomputed on debounced scroll events.
//!
//! Output is a stream of line records plus a parallel gutter stream; the
//! host owns painting and diffing.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::brackets::BracketLevelMap;
use crate::highlight::{self, HighlightOptions, SearchOverlay};
use crate::regions::{self, RegionMap};
use crate::search::SearchState;

/// Largest document rendered synchronously in one pass.
pub const DIRECT_MAX_LINES: usize = 5000;
/// Largest document rendered progressively; above this, virtualize.
pub const PROGRESSIVE_MAX_LINES: usize = 50000;
/// Lines classified per progressive chunk.
pub const PROGRESSIVE_CHUNK: usize = 1000;
/// Buffer lines rendered above the first visible line.
pub const WINDOW_BUFFER_ABOVE: usize = 10;
/// Extra lines rendered beyond the viewport height.
pub const WINDOW_BUFFER_EXTRA: usize = 20;
/// Scroll debounce delay.
pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    Direct,
    Progressive,
    Virtualized,
}

impl RenderStrategy {
    pub fn select(line_count: usize) -> RenderStrategy {
        if line_count <= DIRECT_MAX_LINES {
            RenderStrategy::Direct
        } else if line_count <= PROGRESSIVE_MAX_LINES {
            RenderStrategy::Progressive
        } else {
            RenderStrategy::Virtualized
        }
    }
}

/// One rendered line for the host to paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRecord {
    pub line_number: usize,
    pub markup: String,
    pub hidden: bool,
    pub is_region_start: bool,
}

/// Gutter cell paired with a line record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GutterRecord {
    pub line_number: usize,
    pub has_toggle: bool,
    pub collapsed: bool,
}

/// A batch of rendered lines with their gutter cells.
#[derive(Debug, Clone, Default)]
pub struct RenderOutput {
    pub lines: Vec<LineRecord>,
    pub gutter: Vec<GutterRecord>,
}

/// Everything needed to classify a line, borrowed from the owning tab.
pub struct RenderContext<'a> {
    pub lines: &'a [String],
    pub regions: &'a RegionMap,
    pub brackets: &'a BracketLevelMap,
    pub options: &'a HighlightOptions,
    search: Option<&'a SearchState>,
    matched_lines: HashSet<usize>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        lines: &'a [String],
        regions: &'a RegionMap,
        brackets: &'a BracketLevelMap,
        options: &'a HighlightOptions,
        search: Option<&'a SearchState>,
    ) -> Self {
        let matched_lines = search
            .filter(|s| !s.query.is_empty())
            .map(|s| s.matched_lines())
            .unwrap_or_default();
        RenderContext { lines, regions, brackets, options, search, matched_lines }
    }

    fn record(&self, line_number: usize) -> (LineRecord, GutterRecord) {
        let line = &self.lines[line_number - 1];
        let region = self.regions.get(&line_number);

        let overlay = self
            .search
            .filter(|_| self.matched_lines.contains(&line_number))
            .map(|s| SearchOverlay {
                query: &s.query,
                mode: s.mode,
                current: current_match_index_in_line(s, line_number),
            });

        let markup = highlight::highlight_line(
            line,
            line_number,
            self.regions,
            self.brackets,
            overlay,
            self.options,
        );

        let record = LineRecord {
            line_number,
            markup,
            hidden: regions::is_line_hidden(self.regions, line_number),
            is_region_start: region.is_some(),
        };
        let gutter = GutterRecord {
            line_number,
            has_toggle: region.is_some(),
            collapsed: region.is_some_and(|r| r.collapsed),
        };
        (record, gutter)
    }

    /// Render an inclusive 1-based line range.
    pub fn render_range(&self, start: usize, end: usize) -> RenderOutput {
        let end = end.min(self.lines.len());
        let mut output = RenderOutput::default();
        for line_number in start..=end {
            if line_number == 0 {
                continue;
            }
            let (record, gutter) = self.record(line_number);
            output.lines.push(record);
            output.gutter.push(gutter);
        }
        output
    }

    /// Render the whole document synchronously.
    pub fn render_direct(&self) -> RenderOutput {
        self.render_range(1, self.lines.len())
    }

    /// Re-render just the line range of one region after its collapse
    /// flag flipped. Region and bracket maps are untouched; only hidden
    /// flags, the toggle icon, and the start line's badge change.
    pub fn region_patch(&self, start_line: usize) -> Option<RenderOutput> {
        let region = self.regions.get(&start_line)?;
        Some(self.render_range(region.start_line, region.end_line))
    }
}

/// Index of the navigation cursor's match among its own line's matches,
/// when that line is `line_number`. The highlighter numbers a line's
/// matching spans left to right, which mirrors the column ordering of
/// the match list.
fn current_match_index_in_line(state: &SearchState, line_number: usize) -> Option<usize> {
    let idx = state.current?;
    let current = state.matches.get(idx)?;
    if current.line_number != line_number {
        return None;
    }
    Some(
        state.matches[..idx]
            .iter()
            .filter(|m| m.line_number == line_number)
            .count(),
    )
}

/// Re-entrant chunked render over the whole document.
///
/// The owner calls [`next_chunk`](ProgressiveRender::next_chunk) once per
/// idle tick until it returns `None`. A render started before a content
/// change carries a stale generation; the owner drops its chunks instead
/// of applying them.
#[derive(Debug)]
pub struct ProgressiveRender {
    total: usize,
    next_line: usize,
    generation: u64,
}

/// One progressive batch, with completion progress for the host's
/// indicator.
#[derive(Debug)]
pub struct ProgressiveChunk {
    pub output: RenderOutput,
    pub percent: u8,
    pub done: bool,
}

impl ProgressiveRender {
    pub fn new(total_lines: usize, generation: u64) -> Self {
        ProgressiveRender { total: total_lines, next_line: 1, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_done(&self) -> bool {
        self.next_line > self.total
    }

    pub fn next_chunk(&mut self, ctx: &RenderContext<'_>) -> Option<ProgressiveChunk> {
        if self.is_done() {
            return None;
        }
        let start = self.next_line;
        let end = (start + PROGRESSIVE_CHUNK - 1).min(self.total);
        self.next_line = end + 1;

        let output = ctx.render_range(start, end);
        let percent = (end * 100 / self.total.max(1)) as u8;
        Some(ProgressiveChunk { output, percent, done: self.is_done() })
    }
}

/// Host-reported scroll position, in whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub first_visible_line: usize,
    pub visible_line_count: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { first_visible_line: 1, visible_line_count: 40 }
    }
}

/// Line count with trailing empty lines excluded, so the scrollable
/// extent reflects actual content.
pub fn content_line_count(lines: &[String]) -> usize {
    let trailing_blank = lines.iter().rev().take_while(|l| l.is_empty()).count();
    lines.len() - trailing_blank
}

/// Inclusive 1-based window to classify for a viewport: the visible
/// lines plus fixed buffers above and below, clamped to content.
pub fn visible_window(viewport: Viewport, content_lines: usize) -> (usize, usize) {
    if content_lines == 0 {
        return (1, 0);
    }
    let start = viewport
        .first_visible_line
        .saturating_sub(WINDOW_BUFFER_ABOVE)
        .max(1);
    let count = viewport.visible_line_count + WINDOW_BUFFER_EXTRA;
    let end = (start + count - 1).min(content_lines);
    (start, end)
}

/// Render the buffered window around a viewport.
pub fn render_window(ctx: &RenderContext<'_>, viewport: Viewport) -> RenderOutput {
    let (start, end) = visible_window(viewport, content_line_count(ctx.lines));
    if end < start {
        return RenderOutput::default();
    }
    ctx.render_range(start, end)
}

/// Trailing-edge debounce for scroll and resize bursts.
///
/// Each event pokes the debouncer; the owner polls [`ready`](Debouncer::ready)
/// from its tick and re-renders when a burst has gone quiet for the
/// configured delay.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending_since: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer { delay, pending_since: None }
    }

    /// Record an event, restarting the quiet-period timer.
    pub fn poke(&mut self) {
        self.pending_since = Some(Instant::now());
    }

    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// True once per burst, after the delay has elapsed with no new poke.
    pub fn ready(&mut self) -> bool {
        match self.pending_since {
            Some(at) if at.elapsed() >= self.delay => {
                self.pending_since = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brackets::calculate_bracket_levels;
    use crate::format::{format_value, split_lines};
    use crate::regions::build_region_map;
    use crate::search::SearchMode;
    use serde_json::json;
    use std::collections::HashMap;

    fn fixture_lines() -> Vec<String> {
        split_lines(&format_value(&json!({"a": 1, "b": [1, 2, 3]}), 2))
    }

    #[test]
    fn test_strategy_selection_thresholds() {
        assert_eq!(RenderStrategy::select(1), RenderStrategy::Direct);
        assert_eq!(RenderStrategy::select(5000), RenderStrategy::Direct);
        assert_eq!(RenderStrategy::select(5001), RenderStrategy::Progressive);
        assert_eq!(RenderStrategy::select(6000), RenderStrategy::Progressive);
        assert_eq!(RenderStrategy::select(50000), RenderStrategy::Progressive);
        assert_eq!(RenderStrategy::select(50001), RenderStrategy::Virtualized);
        assert_eq!(RenderStrategy::select(60000), RenderStrategy::Virtualized);
    }

    #[test]
    fn test_direct_render_emits_parallel_streams() {
        let lines = fixture_lines();
        let regions = build_region_map(&lines);
        let brackets = calculate_bracket_levels(&lines);
        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, None);

        let output = ctx.render_direct();
        assert_eq!(output.lines.len(), lines.len());
        assert_eq!(output.gutter.len(), lines.len());

        // The "b" array opens a region; its gutter cell gets a toggle.
        let start = output
            .lines
            .iter()
            .find(|r| lines[r.line_number - 1].contains("\"b\": ["))
            .unwrap();
        assert!(start.is_region_start);
        let gutter = &output.gutter[start.line_number - 1];
        assert!(gutter.has_toggle);
        assert!(!gutter.collapsed);
        // The root line is also a region start.
        assert!(output.lines[0].is_region_start);
    }

    #[test]
    fn test_region_patch_after_toggle() {
        let lines = fixture_lines();
        let mut regions = build_region_map(&lines);
        let brackets = calculate_bracket_levels(&lines);
        let start_line = *regions
            .iter()
            .find(|(_, r)| r.item_count == 3)
            .map(|(line, _)| line)
            .unwrap();
        regions.get_mut(&start_line).unwrap().collapsed = true;

        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, None);
        let patch = ctx.region_patch(start_line).unwrap();

        // Exactly the three element lines are hidden; the closing line
        // stays visible; the opening line carries the [3] badge.
        let hidden: Vec<usize> = patch
            .lines
            .iter()
            .filter(|r| r.hidden)
            .map(|r| r.line_number)
            .collect();
        assert_eq!(hidden, vec![start_line + 1, start_line + 2, start_line + 3]);
        assert!(!patch.lines.last().unwrap().hidden);
        assert!(patch.lines[0].markup.contains("[3]"));
        assert!(patch.gutter[0].collapsed);
    }

    #[test]
    fn test_progressive_chunks_cover_document_once() {
        let lines: Vec<String> = (0..2500).map(|i| format!("{i},")).collect();
        let regions = RegionMap::new();
        let brackets = HashMap::new();
        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, None);

        let mut render = ProgressiveRender::new(lines.len(), 7);
        assert_eq!(render.generation(), 7);

        let mut seen = 0;
        let mut percents = Vec::new();
        while let Some(chunk) = render.next_chunk(&ctx) {
            seen += chunk.output.lines.len();
            percents.push(chunk.percent);
        }
        assert_eq!(seen, 2500);
        assert_eq!(percents, vec![40, 80, 100]);
        assert!(render.is_done());
        assert!(render.next_chunk(&ctx).is_none());
    }

    #[test]
    fn test_visible_window_buffers_and_clamps() {
        let viewport = Viewport { first_visible_line: 100, visible_line_count: 50 };
        let (start, end) = visible_window(viewport, 60000);
        assert_eq!(start, 90);
        assert_eq!(end, 90 + 50 + WINDOW_BUFFER_EXTRA - 1);

        // Near the top the buffer clamps to line 1.
        let viewport = Viewport { first_visible_line: 3, visible_line_count: 50 };
        let (start, _) = visible_window(viewport, 60000);
        assert_eq!(start, 1);

        // Near the bottom the window clamps to the content extent.
        let viewport = Viewport { first_visible_line: 59990, visible_line_count: 50 };
        let (_, end) = visible_window(viewport, 60000);
        assert_eq!(end, 60000);
    }

    #[test]
    fn test_trailing_blank_lines_excluded_from_extent() {
        let mut lines = fixture_lines();
        let content = lines.len();
        lines.push(String::new());
        lines.push(String::new());

        assert_eq!(content_line_count(&lines), content);

        let regions = build_region_map(&lines);
        let brackets = calculate_bracket_levels(&lines);
        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, None);
        let viewport = Viewport { first_visible_line: 1, visible_line_count: 100 };
        let output = render_window(&ctx, viewport);

        assert_eq!(output.lines.len(), content);
    }

    #[test]
    fn test_search_overlay_applied_to_matched_lines_only() {
        let lines = fixture_lines();
        let regions = build_region_map(&lines);
        let brackets = calculate_bracket_levels(&lines);
        let mut search = SearchState::default();
        search.run(&lines, "b", SearchMode::Key);
        assert_eq!(search.matches.len(), 1);

        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, Some(&search));
        let output = ctx.render_direct();

        let highlighted: Vec<usize> = output
            .lines
            .iter()
            .filter(|r| r.markup.contains("search-highlight"))
            .map(|r| r.line_number)
            .collect();
        assert_eq!(highlighted, vec![search.matches[0].line_number]);
    }

    #[test]
    fn test_navigation_cursor_marks_one_match() {
        let lines = split_lines(&format_value(&json!({"k1": "vx", "k2": "vx"}), 2));
        let regions = build_region_map(&lines);
        let brackets = calculate_bracket_levels(&lines);
        let mut search = SearchState::default();
        search.run(&lines, "vx", SearchMode::Value);
        assert_eq!(search.matches.len(), 2);
        assert_eq!(search.current, Some(0));

        let opts = HighlightOptions::default();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, Some(&search));
        let output = ctx.render_direct();

        let current_lines: Vec<usize> = output
            .lines
            .iter()
            .filter(|r| r.markup.contains("search-highlight current"))
            .map(|r| r.line_number)
            .collect();
        assert_eq!(current_lines, vec![search.matches[0].line_number]);

        // Stepping the cursor moves the marker to the other match.
        search.next();
        let ctx = RenderContext::new(&lines, &regions, &brackets, &opts, Some(&search));
        let output = ctx.render_direct();
        let current_lines: Vec<usize> = output
            .lines
            .iter()
            .filter(|r| r.markup.contains("search-highlight current"))
            .map(|r| r.line_number)
            .collect();
        assert_eq!(current_lines, vec![search.matches[1].line_number]);
    }

    #[test]
    fn test_debouncer_fires_once_per_burst() {
        let mut debouncer = Debouncer::new(Duration::from_millis(5));
        assert!(!debouncer.ready());

        debouncer.poke();
        debouncer.poke();
        assert!(debouncer.is_pending());
        std::thread::sleep(Duration::from_millis(10));
        assert!(debouncer.ready());
        assert!(!debouncer.ready());
        assert!(!debouncer.is_pending());
    }
}
