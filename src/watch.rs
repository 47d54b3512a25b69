use directories::ProjectDirs;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{LazyLock, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Key under which the watched-episodes blob is persisted
pub const WATCHED_KEY: &str = "watchedEpisodes";

/// Map from episode identifier (see [`EpisodeId`]) to its watched flag
pub type WatchMap = HashMap<String, bool>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("data directory not found")]
    NoDataDir,
    #[error("failed to write store: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize watch state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Minimal string key-value storage, the shape of a browser's local storage.
///
/// Values are opaque strings; callers own the serialization.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Store rooted in the platform data directory
    pub fn in_data_dir() -> Result<Self, StoreError> {
        ProjectDirs::from("", "", "vitrine")
            .map(|dirs| Self::new(dirs.data_dir().to_path_buf()))
            .ok_or(StoreError::NoDataDir)
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", key.replace(['/', '\\', ':'], "_")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => Some(contents),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "failed to read store");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory store, used by tests and when no data directory is available
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

static EPISODE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*)_s(\d+)e(\d+)$").expect("episode id pattern"));

/// Identifier of one episode of one series: `{series}_s{season}e{episode}`.
///
/// Two series with the same title share identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeId {
    pub series: String,
    pub season: u32,
    pub episode: u32,
}

impl EpisodeId {
    pub fn new(series: &str, season: u32, episode: u32) -> Self {
        Self {
            series: series.to_string(),
            season,
            episode,
        }
    }

    /// Split a stored identifier back into its parts.
    /// The season/episode suffix is matched at the end, so titles may contain `_s`.
    pub fn parse(key: &str) -> Option<Self> {
        let caps = EPISODE_ID_RE.captures(key)?;
        Some(Self {
            series: caps.get(1)?.as_str().to_string(),
            season: caps.get(2)?.as_str().parse().ok()?,
            episode: caps.get(3)?.as_str().parse().ok()?,
        })
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_s{}e{}", self.series, self.season, self.episode)
    }
}

pub fn episode_id(series: &str, season: u32, episode: u32) -> String {
    EpisodeId::new(series, season, episode).to_string()
}

/// Watched flags for episodes, persisted as one JSON object in a [`KeyValueStore`].
///
/// Every read re-parses the stored blob and every write replaces it,
/// so concurrent writers from other processes follow last-write-wins.
pub struct WatchState<S> {
    store: S,
}

impl<S: KeyValueStore> WatchState<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current mapping; an absent or unreadable blob is an empty mapping
    pub fn snapshot(&self) -> WatchMap {
        let Some(raw) = self.store.get(WATCHED_KEY) else {
            return WatchMap::new();
        };

        match serde_json::from_str(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(error = %e, "watch state is corrupt, treating as empty");
                WatchMap::new()
            }
        }
    }

    pub fn is_watched(&self, series: &str, season: u32, episode: u32) -> bool {
        is_watched_in(&self.snapshot(), series, season, episode)
    }

    pub fn mark_watched(&self, series: &str, season: u32, episode: u32) -> Result<(), StoreError> {
        let mut watched = self.snapshot();
        let key = episode_id(series, season, episode);
        debug!(episode = %key, "marking episode watched");
        watched.insert(key, true);

        let blob = serde_json::to_string(&watched)?;
        self.store.set(WATCHED_KEY, &blob)
    }

    /// True if at least one episode of exactly this series is recorded as watched
    pub fn in_progress(&self, series: &str) -> bool {
        in_progress_in(&self.snapshot(), series)
    }
}

pub fn is_watched_in(watched: &WatchMap, series: &str, season: u32, episode: u32) -> bool {
    watched
        .get(&episode_id(series, season, episode))
        .copied()
        .unwrap_or(false)
}

pub fn in_progress_in(watched: &WatchMap, series: &str) -> bool {
    watched.iter().any(|(key, flag)| {
        *flag && EpisodeId::parse(key).is_some_and(|id| id.series == series)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> WatchState<MemoryStore> {
        WatchState::new(MemoryStore::new())
    }

    #[test]
    fn test_episode_id_format() {
        assert_eq!(episode_id("Dark", 1, 3), "Dark_s1e3");
        assert_eq!(episode_id("The Office", 10, 22), "The Office_s10e22");
    }

    #[test]
    fn test_episode_id_parse() {
        assert_eq!(
            EpisodeId::parse("Dark_s2e5"),
            Some(EpisodeId::new("Dark", 2, 5))
        );
        // Titles may contain the season marker themselves
        assert_eq!(
            EpisodeId::parse("My_show_s3_s1e2"),
            Some(EpisodeId::new("My_show_s3", 1, 2))
        );
        assert_eq!(EpisodeId::parse("Dark"), None);
        assert_eq!(EpisodeId::parse("Dark_s1"), None);
        assert_eq!(EpisodeId::parse("Dark_sxe1"), None);
    }

    #[test]
    fn test_mark_then_is_watched() {
        let watch = state();
        assert!(!watch.is_watched("Dark", 1, 1));

        watch.mark_watched("Dark", 1, 1).unwrap();

        assert!(watch.is_watched("Dark", 1, 1));
        assert!(!watch.is_watched("Dark", 1, 2));
        assert!(!watch.is_watched("Dark", 2, 1));
        assert!(!watch.is_watched("Lost", 1, 1));
    }

    #[test]
    fn test_mark_watched_is_idempotent() {
        let watch = state();
        watch.mark_watched("Dark", 1, 1).unwrap();
        watch.mark_watched("Dark", 1, 1).unwrap();

        let snapshot = watch.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get("Dark_s1e1"), Some(&true));
    }

    #[test]
    fn test_mark_watched_keeps_existing_entries() {
        let watch = state();
        watch.mark_watched("Dark", 1, 1).unwrap();
        watch.mark_watched("Lost", 4, 2).unwrap();

        assert!(watch.is_watched("Dark", 1, 1));
        assert!(watch.is_watched("Lost", 4, 2));
    }

    #[test]
    fn test_corrupt_blob_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(WATCHED_KEY, "{not json").unwrap();
        let watch = WatchState::new(store);

        assert!(!watch.is_watched("Dark", 1, 1));
        assert!(watch.snapshot().is_empty());
        assert!(!watch.in_progress("Dark"));
    }

    #[test]
    fn test_mark_watched_recovers_from_corrupt_blob() {
        let store = MemoryStore::new();
        store.set(WATCHED_KEY, "[1, 2, 3]").unwrap();
        let watch = WatchState::new(store);

        watch.mark_watched("Dark", 1, 1).unwrap();
        assert!(watch.is_watched("Dark", 1, 1));
    }

    #[test]
    fn test_false_flag_is_not_watched() {
        let store = MemoryStore::new();
        store.set(WATCHED_KEY, r#"{"Dark_s1e1": false}"#).unwrap();
        let watch = WatchState::new(store);

        assert!(!watch.is_watched("Dark", 1, 1));
        assert!(!watch.in_progress("Dark"));
    }

    #[test]
    fn test_in_progress_uses_exact_title() {
        let watch = state();
        watch.mark_watched("Alien Resurrection", 1, 1).unwrap();

        assert!(watch.in_progress("Alien Resurrection"));
        assert!(!watch.in_progress("Alien"));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!("vitrine-store-{}", std::process::id()));
        let store = FileStore::new(dir.clone());
        assert_eq!(store.get(WATCHED_KEY), None);

        let watch = WatchState::new(store);
        watch.mark_watched("Dark", 3, 8).unwrap();

        let reopened = WatchState::new(FileStore::new(dir.clone()));
        assert!(reopened.is_watched("Dark", 3, 8));

        let _ = std::fs::remove_dir_all(dir);
    }
}
