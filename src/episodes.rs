use std::collections::HashSet;

use tracing::{info, warn};

use crate::catalog::{CatalogItem, Episode, Season};
use crate::playback::PlaybackRequest;
use crate::watch::{KeyValueStore, WatchMap, WatchState, is_watched_in};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonSelection {
    /// The series has no seasons; nothing to browse
    NoSeasonSelected,
    Selected(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonTab {
    pub number: u32,
    pub title: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRow {
    pub number: u32,
    pub title: String,
    pub duration: String,
    pub description: String,
    pub watched: bool,
    pub selected: bool,
}

/// What the episode panel shows for the current selection
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodePanel {
    Hidden,
    Shown {
        seasons: Vec<SeasonTab>,
        episodes: Vec<EpisodeRow>,
    },
}

/// Season/episode navigation for one series inside the playback surface
#[derive(Debug, Clone)]
pub struct EpisodeBrowser {
    series: CatalogItem,
    selection: SeasonSelection,
    episode_cursor: usize,
    /// (season, episode) played during this session, shown as watched
    /// even when persisting the flag failed
    played: HashSet<(u32, u32)>,
}

impl EpisodeBrowser {
    pub fn open(series: &CatalogItem) -> Self {
        let selection = if series.seasons.is_empty() {
            SeasonSelection::NoSeasonSelected
        } else {
            SeasonSelection::Selected(0)
        };

        Self {
            series: series.clone(),
            selection,
            episode_cursor: 0,
            played: HashSet::new(),
        }
    }

    pub fn series(&self) -> &CatalogItem {
        &self.series
    }

    pub fn selection(&self) -> SeasonSelection {
        self.selection
    }

    pub fn is_hidden(&self) -> bool {
        self.selection == SeasonSelection::NoSeasonSelected
    }

    /// Switch to another season; out-of-range indices are ignored
    pub fn select_season(&mut self, index: usize) -> bool {
        if self.is_hidden() || index >= self.series.seasons.len() {
            return false;
        }
        if self.selection != SeasonSelection::Selected(index) {
            self.selection = SeasonSelection::Selected(index);
            self.episode_cursor = 0;
        }
        true
    }

    pub fn select_next_season(&mut self) {
        if let SeasonSelection::Selected(index) = self.selection {
            self.select_season(index + 1);
        }
    }

    pub fn select_previous_season(&mut self) {
        if let SeasonSelection::Selected(index) = self.selection
            && index > 0
        {
            self.select_season(index - 1);
        }
    }

    pub fn selected_season(&self) -> Option<&Season> {
        match self.selection {
            SeasonSelection::Selected(index) => self.series.seasons.get(index),
            SeasonSelection::NoSeasonSelected => None,
        }
    }

    pub fn episode_cursor(&self) -> usize {
        self.episode_cursor
    }

    pub fn select_next_episode(&mut self) {
        let count = self.selected_season().map_or(0, |s| s.episodes.len());
        if count > 0 {
            self.episode_cursor = (self.episode_cursor + 1).min(count - 1);
        }
    }

    pub fn select_previous_episode(&mut self) {
        if self.episode_cursor > 0 {
            self.episode_cursor -= 1;
        }
    }

    pub fn selected_episode(&self) -> Option<&Episode> {
        self.selected_season()?.episodes.get(self.episode_cursor)
    }

    /// Render the panel from the selection and a watch-state snapshot
    pub fn view(&self, watched: &WatchMap) -> EpisodePanel {
        let SeasonSelection::Selected(active) = self.selection else {
            return EpisodePanel::Hidden;
        };
        let Some(season) = self.series.seasons.get(active) else {
            return EpisodePanel::Hidden;
        };

        let seasons = self
            .series
            .seasons
            .iter()
            .enumerate()
            .map(|(index, s)| SeasonTab {
                number: s.number,
                title: s.title.clone(),
                active: index == active,
            })
            .collect();

        let episodes = season
            .episodes
            .iter()
            .enumerate()
            .map(|(index, ep)| EpisodeRow {
                number: ep.number,
                title: ep.title.clone(),
                duration: ep.duration.clone(),
                description: ep.description.clone().unwrap_or_default(),
                watched: self.played.contains(&(season.number, ep.number))
                    || is_watched_in(watched, &self.series.title, season.number, ep.number),
                selected: index == self.episode_cursor,
            })
            .collect();

        EpisodePanel::Shown { seasons, episodes }
    }

    /// Mark an episode of the selected season watched and build its playback request.
    ///
    /// The mark is kept even if playback fails afterwards.
    pub fn play<S: KeyValueStore>(
        &mut self,
        index: usize,
        watch: &WatchState<S>,
    ) -> Option<PlaybackRequest> {
        let season = self.selected_season()?;
        let season_number = season.number;
        let episode = season.episodes.get(index)?.clone();

        self.episode_cursor = index;
        self.played.insert((season_number, episode.number));
        if let Err(e) = watch.mark_watched(&self.series.title, season_number, episode.number) {
            warn!(error = %e, "failed to persist watched episode");
        }

        info!(
            series = %self.series.title,
            season = season_number,
            episode = episode.number,
            "playing episode"
        );

        Some(PlaybackRequest {
            title: format!("{} - Episode {}", self.series.title, episode.number),
            link: episode.link,
        })
    }

    pub fn play_selected<S: KeyValueStore>(
        &mut self,
        watch: &WatchState<S>,
    ) -> Option<PlaybackRequest> {
        self.play(self.episode_cursor, watch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::watch::MemoryStore;

    fn series() -> CatalogItem {
        let catalog = Catalog::from_json(
            r#"{"items": [{
                "title": "Dark",
                "type": "series",
                "description": "Winden.",
                "seasons": [
                    {"number": 1, "title": "Season 1", "episodes": [
                        {"number": 1, "title": "Secrets", "duration": "51 min", "link": "videos/s1e1.mp4"},
                        {"number": 2, "title": "Lies", "duration": "44 min", "description": "Ulrich digs.", "link": "videos/s1e2.mp4"}
                    ]},
                    {"number": 2, "title": "Season 2", "episodes": [
                        {"number": 1, "title": "Beginnings and Endings", "duration": "53 min"}
                    ]}
                ]
            }]}"#,
        )
        .unwrap();
        catalog.items()[0].clone()
    }

    fn shown(panel: EpisodePanel) -> (Vec<SeasonTab>, Vec<EpisodeRow>) {
        match panel {
            EpisodePanel::Shown { seasons, episodes } => (seasons, episodes),
            EpisodePanel::Hidden => panic!("panel should be shown"),
        }
    }

    #[test]
    fn test_opens_on_first_season() {
        let browser = EpisodeBrowser::open(&series());
        assert_eq!(browser.selection(), SeasonSelection::Selected(0));

        let (seasons, episodes) = shown(browser.view(&WatchMap::new()));
        assert_eq!(seasons.len(), 2);
        assert!(seasons[0].active);
        assert!(!seasons[1].active);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[1].description, "Ulrich digs.");
        assert!(episodes[0].selected);
    }

    #[test]
    fn test_zero_seasons_renders_nothing() {
        let mut item = series();
        item.seasons.clear();
        let mut browser = EpisodeBrowser::open(&item);

        assert_eq!(browser.selection(), SeasonSelection::NoSeasonSelected);
        assert_eq!(browser.view(&WatchMap::new()), EpisodePanel::Hidden);
        assert!(!browser.select_season(0));
        assert_eq!(browser.selection(), SeasonSelection::NoSeasonSelected);

        let watch = WatchState::new(MemoryStore::new());
        assert!(browser.play(0, &watch).is_none());
    }

    #[test]
    fn test_select_season_single_active() {
        let mut browser = EpisodeBrowser::open(&series());
        browser.select_next_episode();
        assert!(browser.select_season(1));

        let (seasons, episodes) = shown(browser.view(&WatchMap::new()));
        let active: Vec<bool> = seasons.iter().map(|s| s.active).collect();
        assert_eq!(active, vec![false, true]);
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].title, "Beginnings and Endings");
        assert_eq!(browser.episode_cursor(), 0);

        assert!(!browser.select_season(5));
        assert_eq!(browser.selection(), SeasonSelection::Selected(1));
    }

    #[test]
    fn test_play_marks_watched_and_builds_request() {
        let watch = WatchState::new(MemoryStore::new());
        let mut browser = EpisodeBrowser::open(&series());

        let request = browser.play(1, &watch).unwrap();
        assert_eq!(request.title, "Dark - Episode 2");
        assert_eq!(request.link.as_deref(), Some("videos/s1e2.mp4"));
        assert!(watch.is_watched("Dark", 1, 2));
        assert!(!watch.is_watched("Dark", 1, 1));

        let (_, episodes) = shown(browser.view(&watch.snapshot()));
        assert!(!episodes[0].watched);
        assert!(episodes[1].watched);
        assert!(episodes[1].selected);
    }

    #[test]
    fn test_play_without_link_still_marks() {
        let watch = WatchState::new(MemoryStore::new());
        let mut browser = EpisodeBrowser::open(&series());
        browser.select_season(1);

        let request = browser.play_selected(&watch).unwrap();
        assert_eq!(request.link, None);
        assert!(watch.is_watched("Dark", 2, 1));
    }

    #[test]
    fn test_watched_from_store_at_render() {
        let watch = WatchState::new(MemoryStore::new());
        watch.mark_watched("Dark", 1, 1).unwrap();
        let browser = EpisodeBrowser::open(&series());

        let (_, episodes) = shown(browser.view(&watch.snapshot()));
        assert!(episodes[0].watched);
        assert!(!episodes[1].watched);
    }

    #[test]
    fn test_episode_cursor_bounds() {
        let mut browser = EpisodeBrowser::open(&series());
        browser.select_previous_episode();
        assert_eq!(browser.episode_cursor(), 0);
        browser.select_next_episode();
        browser.select_next_episode();
        assert_eq!(browser.episode_cursor(), 1);
        assert_eq!(browser.selected_episode().map(|e| e.number), Some(2));
    }
}
