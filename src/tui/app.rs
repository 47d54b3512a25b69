use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::card::{Card, PlayIntent};
use crate::catalog::{Catalog, CatalogError, CatalogItem, Row};
use crate::config::Config;
use crate::notice::Notices;
use crate::playback::{Launch, PlaybackResolver, PlaybackUpdate};
use crate::search::{SearchOutcome, search};
use crate::watch::{KeyValueStore, WatchState};

pub type Watch = WatchState<Box<dyn KeyValueStore>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Hero and card rows
    Home,
    /// Search input focused, results overlay follows the query
    Search,
}

pub struct App {
    pub view: View,
    pub should_quit: bool,
    pub tick: u64,

    // Catalog
    pub catalog: Catalog,
    pub is_loading_catalog: bool,
    pub rows: Vec<Row>,
    pub selected_row_index: usize,
    pub selected_item_index: usize,

    // Search
    pub search_input: String,
    pub selected_result_index: usize,

    pub notices: Notices,
    pub watch: Watch,
    pub resolver: PlaybackResolver,
}

impl App {
    pub fn new(config: &Config, watch: Watch) -> Self {
        Self {
            view: View::Home,
            should_quit: false,
            tick: 0,
            catalog: Catalog::default(),
            is_loading_catalog: true,
            rows: Vec::new(),
            selected_row_index: 0,
            selected_item_index: 0,
            search_input: String::new(),
            selected_result_index: 0,
            notices: Notices::new(Duration::from_millis(config.ui.notice_ms)),
            watch,
            resolver: PlaybackResolver::new(config),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading_catalog || self.resolver.surface().is_loading()
    }

    pub fn surface_open(&self) -> bool {
        self.resolver.surface().open
    }

    /// Catalog fetch finished; on failure the app keeps going with an empty catalog
    pub fn catalog_loaded(&mut self, result: Result<Catalog, CatalogError>) {
        self.is_loading_catalog = false;
        match result {
            Ok(catalog) => {
                self.catalog = catalog;
            }
            Err(e) => {
                error!(error = %e, "failed to load catalog");
                self.catalog = Catalog::default();
                self.notices.push("Failed to load catalog");
            }
        }
        self.refresh_rows();
    }

    /// Rebuild rows; "Continue watching" depends on the watch state.
    /// The focused row is kept by title when rows come and go.
    pub fn refresh_rows(&mut self) {
        let focused = self
            .rows
            .get(self.selected_row_index)
            .map(|row| row.title.clone());
        self.rows = self.catalog.rows(&self.watch.snapshot());

        match focused.and_then(|title| self.rows.iter().position(|row| row.title == title)) {
            Some(index) => self.selected_row_index = index,
            None if self.selected_row_index >= self.rows.len() => {
                self.selected_row_index = self.rows.len().saturating_sub(1);
            }
            None => {}
        }
        let row_len = self
            .rows
            .get(self.selected_row_index)
            .map_or(0, |r| r.items.len());
        if self.selected_item_index >= row_len {
            self.selected_item_index = row_len.saturating_sub(1);
        }
    }

    pub fn hero(&self) -> Option<&CatalogItem> {
        self.catalog.hero()
    }

    // Row navigation
    pub fn select_next_row(&mut self) {
        if !self.rows.is_empty() {
            self.selected_row_index = (self.selected_row_index + 1).min(self.rows.len() - 1);
            self.selected_item_index = 0;
        }
    }

    pub fn select_previous_row(&mut self) {
        if self.selected_row_index > 0 {
            self.selected_row_index -= 1;
            self.selected_item_index = 0;
        }
    }

    pub fn select_next_item(&mut self) {
        if let Some(row) = self.rows.get(self.selected_row_index)
            && !row.items.is_empty()
        {
            self.selected_item_index = (self.selected_item_index + 1).min(row.items.len() - 1);
        }
    }

    pub fn select_previous_item(&mut self) {
        if self.selected_item_index > 0 {
            self.selected_item_index -= 1;
        }
    }

    pub fn selected_row_item(&self) -> Option<&CatalogItem> {
        self.rows
            .get(self.selected_row_index)
            .and_then(|row| row.items.get(self.selected_item_index))
    }

    // Search
    pub fn search_outcome(&self) -> SearchOutcome<'_> {
        search(self.catalog.items(), &self.search_input)
    }

    pub fn search_open(&self) -> bool {
        self.search_outcome().is_open()
    }

    pub fn open_search(&mut self) {
        self.view = View::Search;
    }

    pub fn search_push(&mut self, c: char) {
        self.search_input.push(c);
        self.selected_result_index = 0;
    }

    pub fn search_pop(&mut self) {
        self.search_input.pop();
        self.selected_result_index = 0;
    }

    /// Close the results view and clear the query
    pub fn close_search(&mut self) {
        self.search_input.clear();
        self.selected_result_index = 0;
        self.view = View::Home;
    }

    pub fn select_next_result(&mut self) {
        let count = self.search_outcome().items().len();
        if count > 0 {
            self.selected_result_index = (self.selected_result_index + 1).min(count - 1);
        }
    }

    pub fn select_previous_result(&mut self) {
        if self.selected_result_index > 0 {
            self.selected_result_index -= 1;
        }
    }

    pub fn selected_result(&self) -> Option<&CatalogItem> {
        self.search_outcome()
            .items()
            .get(self.selected_result_index)
            .copied()
    }

    /// The card under the cursor, in the results view or on the home rows
    pub fn focused_card(&self) -> Option<Card<'_>> {
        match self.view {
            View::Search => self.selected_result().map(Card::from),
            View::Home => self.selected_row_item().map(Card::from),
        }
    }

    /// Press play on the focused card
    pub fn activate_focused(&mut self) -> Option<Launch> {
        let intent = self.focused_card()?.activate();
        self.play_intent(intent)
    }

    pub fn play_intent(&mut self, intent: PlayIntent) -> Option<Launch> {
        let PlayIntent(item) = intent;
        info!(title = %item.title, "play requested");
        match self.resolver.play_item(&item) {
            Ok(launch) => launch,
            Err(e) => {
                self.notices.push(e.to_string());
                None
            }
        }
    }

    pub fn play_hero(&mut self) -> Option<Launch> {
        let hero = self.hero()?.clone();
        self.play_intent(Card::from(&hero).activate())
    }

    // Playback surface
    pub fn select_next_season(&mut self) {
        if let Some(browser) = self.resolver.surface_mut().episodes.as_mut() {
            browser.select_next_season();
        }
    }

    pub fn select_previous_season(&mut self) {
        if let Some(browser) = self.resolver.surface_mut().episodes.as_mut() {
            browser.select_previous_season();
        }
    }

    pub fn select_season(&mut self, index: usize) {
        if let Some(browser) = self.resolver.surface_mut().episodes.as_mut() {
            browser.select_season(index);
        }
    }

    pub fn select_next_episode(&mut self) {
        if let Some(browser) = self.resolver.surface_mut().episodes.as_mut() {
            browser.select_next_episode();
        }
    }

    pub fn select_previous_episode(&mut self) {
        if let Some(browser) = self.resolver.surface_mut().episodes.as_mut() {
            browser.select_previous_episode();
        }
    }

    /// Play the episode under the cursor; marks it watched first
    pub fn play_selected_episode(&mut self) -> Option<Launch> {
        let request = self
            .resolver
            .surface_mut()
            .episodes
            .as_mut()?
            .play_selected(&self.watch)?;

        self.refresh_rows();
        match self.resolver.play(request) {
            Ok(launch) => Some(launch),
            Err(e) => {
                self.notices.push(e.to_string());
                None
            }
        }
    }

    pub fn handle_playback(&mut self, update: PlaybackUpdate) {
        if let Some(e) = self.resolver.handle(update) {
            warn!(error = %e, "playback error");
            self.notices.push(e.to_string());
        }
    }

    pub fn close_surface(&mut self) {
        self.resolver.close();
    }

    /// Advance animations and drop expired notices
    pub fn on_tick(&mut self, now: Instant) {
        self.tick = self.tick.wrapping_add(1);
        self.notices.prune(now);
    }
}
