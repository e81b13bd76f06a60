//! Multi-tab workspace and command dispatch.
//!
//! The workspace owns the open tabs, the active-tab cursor, and the
//! shared settings. Commands arriving from the host (menu, keyboard)
//! land here and are routed to the active tab.

use log::info;

use crate::document::{LoadRequest, Tab, TabId};
use crate::parse_error::ParseError;
use crate::render::RenderOutput;
use crate::search::{SearchMatch, SearchMode};
use crate::settings::Settings;

#[derive(Debug, Default)]
pub struct Workspace {
    tabs: Vec<Tab>,
    active: Option<TabId>,
    tab_counter: u64,
    pub settings: Settings,
}

impl Workspace {
    pub fn new(settings: Settings) -> Workspace {
        Workspace { tabs: Vec::new(), active: None, tab_counter: 0, settings }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        let id = self.active?;
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active?;
        self.tabs.iter_mut().find(|tab| tab.id == id)
    }

    /// Open an empty tab and make it active.
    pub fn new_tab(&mut self) -> TabId {
        self.tab_counter += 1;
        let id = TabId(self.tab_counter);
        self.tabs.push(Tab::new(id));
        self.active = Some(id);
        id
    }

    /// Load a document into a fresh tab.
    pub fn open_document(&mut self, request: LoadRequest) -> TabId {
        let indent = self.settings.behavior.indent_size;
        let id = self.new_tab();
        if let Some(tab) = self.active_tab_mut() {
            tab.load(request, indent);
        }
        id
    }

    /// Close a tab. When the active tab closes, the tab that slid into
    /// its slot becomes active, or the new last tab if it was rightmost.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let Some(index) = self.tabs.iter().position(|tab| tab.id == id) else {
            return false;
        };
        self.tabs.remove(index);

        if self.active == Some(id) {
            self.active = if self.tabs.is_empty() {
                None
            } else {
                let next = index.min(self.tabs.len() - 1);
                Some(self.tabs[next].id)
            };
        }
        true
    }

    pub fn close_active_tab(&mut self) -> bool {
        match self.active {
            Some(id) => self.close_tab(id),
            None => false,
        }
    }

    pub fn switch_to(&mut self, id: TabId) -> bool {
        if self.tabs.iter().any(|tab| tab.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Re-serialize the active document at the configured indent width.
    pub fn format_active(&mut self) {
        let indent = self.settings.behavior.indent_size;
        if let Some(tab) = self.active_tab_mut() {
            tab.reformat(indent);
        }
    }

    pub fn minify_active(&mut self) {
        if let Some(tab) = self.active_tab_mut() {
            tab.minify();
        }
    }

    /// Validate the active tab's raw text. `None` when no tab is open.
    pub fn validate_active(&self) -> Option<Result<(), ParseError>> {
        self.active_tab().map(Tab::validate)
    }

    pub fn expand_all(&mut self) -> bool {
        self.active_tab_mut().is_some_and(Tab::expand_all)
    }

    pub fn collapse_all(&mut self) -> bool {
        self.active_tab_mut().is_some_and(Tab::collapse_all)
    }

    pub fn search(&mut self, query: &str, mode: SearchMode) -> usize {
        match self.active_tab_mut() {
            Some(tab) => tab.search(query, mode),
            None => 0,
        }
    }

    pub fn search_next(&mut self) -> Option<SearchMatch> {
        self.active_tab_mut()?.search_next()
    }

    pub fn search_previous(&mut self) -> Option<SearchMatch> {
        self.active_tab_mut()?.search_previous()
    }

    /// Render the active tab with the current display settings.
    pub fn render_active(&self) -> Option<RenderOutput> {
        let options = self.settings.highlight_options();
        self.active_tab().map(|tab| tab.render(&options))
    }

    /// Replace settings and persist them. A reformat is triggered when
    /// the indent width changed, since every line-addressed map depends
    /// on the layout.
    pub fn apply_settings(&mut self, settings: Settings) {
        let indent_changed = settings.behavior.indent_size != self.settings.behavior.indent_size;
        self.settings = settings;
        if let Err(e) = self.settings.save() {
            info!("could not persist settings: {}", e);
        }
        if indent_changed {
            let indent = self.settings.behavior.indent_size;
            for tab in &mut self.tabs {
                tab.reformat(indent);
            }
        }
    }
}
