use std::path::PathBuf;

use reqwest::Client;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::watch::{WatchMap, in_progress_in};

/// Number of leading catalog items shown in the "My list" row
const MY_LIST_LEN: usize = 4;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("catalog request returned status {0}")]
    Status(u16),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid catalog document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid catalog source: {0}")]
    InvalidSource(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[serde(alias = "tv")]
    Series,
    #[default]
    #[serde(other)]
    Movie,
}

impl MediaType {
    pub fn label(&self) -> &'static str {
        match self {
            MediaType::Series => "Series",
            MediaType::Movie => "Movie",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogItem {
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub media_type: MediaType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub poster: Option<String>,
    pub backdrop: Option<String>,
    #[serde(default, deserialize_with = "deserialize_year")]
    pub year: Option<u16>,
    /// Playable URL, the playback path for movies
    pub link: Option<String>,
    /// Ordered seasons, the playback path for series
    #[serde(default, deserialize_with = "null_as_default")]
    pub seasons: Vec<Season>,
}

impl CatalogItem {
    pub fn is_series(&self) -> bool {
        self.media_type == MediaType::Series
    }

    pub fn has_seasons(&self) -> bool {
        !self.seasons.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Season {
    pub number: u32,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Episode {
    pub number: u32,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: String,
    pub description: Option<String>,
    pub link: Option<String>,
}

/// `null` reads the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Years show up both as numbers and as strings in hand-written catalogs
fn deserialize_year<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawYear {
        Number(u16),
        Text(String),
    }

    Ok(match Option::<RawYear>::deserialize(deserializer)? {
        Some(RawYear::Number(year)) => Some(year),
        Some(RawYear::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<CatalogItem>,
}

/// A titled row of cards on the home view
#[derive(Debug, Clone)]
pub struct Row {
    pub title: String,
    pub items: Vec<CatalogItem>,
}

/// The loaded catalog; read-only for the rest of the session
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Self {
        Self { items }
    }

    pub fn from_json(body: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(body)?;
        Ok(Self::new(document.items))
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Featured item: the first one in the document
    pub fn hero(&self) -> Option<&CatalogItem> {
        self.items.first()
    }

    pub fn series(&self) -> Vec<&CatalogItem> {
        self.items.iter().filter(|i| i.is_series()).collect()
    }

    pub fn movies(&self) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|i| i.media_type == MediaType::Movie)
            .collect()
    }

    pub fn my_list(&self) -> &[CatalogItem] {
        &self.items[..self.items.len().min(MY_LIST_LEN)]
    }

    /// Series with at least one watched episode
    pub fn in_progress(&self, watched: &WatchMap) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|i| i.is_series() && in_progress_in(watched, &i.title))
            .collect()
    }

    /// Home view rows, empty rows left out
    pub fn rows(&self, watched: &WatchMap) -> Vec<Row> {
        fn row(title: &str, items: Vec<&CatalogItem>) -> Row {
            Row {
                title: title.to_string(),
                items: items.into_iter().cloned().collect(),
            }
        }

        [
            row("All", self.items.iter().collect()),
            row("Continue watching", self.in_progress(watched)),
            row("My list", self.my_list().iter().collect()),
            row("Series", self.series()),
            row("Movies", self.movies()),
        ]
        .into_iter()
        .filter(|r| !r.items.is_empty())
        .collect()
    }
}

/// Where the catalog document lives
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    Http(Url),
    File(PathBuf),
}

impl CatalogSource {
    pub fn parse(source: &str) -> Result<Self, CatalogError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(CatalogError::InvalidSource("empty".to_string()));
        }

        if source.starts_with("http://") || source.starts_with("https://") {
            let url =
                Url::parse(source).map_err(|e| CatalogError::InvalidSource(e.to_string()))?;
            return Ok(CatalogSource::Http(url));
        }

        let path = source.strip_prefix("file://").unwrap_or(source);
        Ok(CatalogSource::File(PathBuf::from(path)))
    }
}

pub struct CatalogLoader {
    client: Client,
    source: CatalogSource,
}

impl CatalogLoader {
    pub fn new(source: CatalogSource) -> Self {
        Self {
            client: Client::new(),
            source,
        }
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Fetch and parse the catalog document in a single round trip
    pub async fn load(&self) -> Result<Catalog, CatalogError> {
        let body = match &self.source {
            CatalogSource::Http(url) => {
                debug!(url = %url, "fetching catalog");
                let response = self.client.get(url.clone()).send().await?;

                if !response.status().is_success() {
                    return Err(CatalogError::Status(response.status().as_u16()));
                }

                response.text().await?
            }
            CatalogSource::File(path) => {
                debug!(path = %path.display(), "reading catalog");
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CatalogError::Read {
                        path: path.clone(),
                        source,
                    })?
            }
        };

        let catalog = Catalog::from_json(&body)?;
        info!(count = catalog.len(), "catalog loaded");
        Ok(catalog)
    }
}
