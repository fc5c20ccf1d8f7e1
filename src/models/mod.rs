use serde::{Deserialize, Serialize};

pub mod preferences;
pub mod profile;

pub use preferences::{GenrePreferenceSet, DEFAULT_GENRES};
pub use profile::{
    MoviePreferencesRow, MovieRow, NewProfile, SettingsUpdate, UserInfo, WatchOutcome,
    WatchedMovie, WatchedMovieRequest, WatchedRow,
};

// ============================================================================
// Catalog (OMDb) Types
// ============================================================================

/// One row of a keyword search page
///
/// Field names follow the catalog's wire format so that cached values and API
/// responses share one shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSummary {
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "imdbID", default)]
    pub imdb_id: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(rename = "Poster", default)]
    pub poster: Option<String>,
}

impl CatalogSummary {
    /// Catalog identifier, ignoring blank values
    pub fn id(&self) -> Option<&str> {
        self.imdb_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// One page of keyword search results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub items: Vec<CatalogSummary>,
    /// Mirrors the catalog's `Response` flag
    pub ok: bool,
    #[serde(default)]
    pub total_results: Option<u32>,
}

/// A rating from one source (IMDb, Rotten Tomatoes, Metacritic)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SourceRating {
    pub source: String,
    pub value: String,
}

/// Full catalog record for one title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogItem {
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    /// Comma-separated genre names, e.g. "Comedy, Romance"
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub plot: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(rename = "imdbRating", default)]
    pub imdb_rating: Option<String>,
    #[serde(rename = "imdbVotes", default)]
    pub imdb_votes: Option<String>,
    #[serde(default)]
    pub box_office: Option<String>,
    #[serde(default)]
    pub production: Option<String>,
    #[serde(default)]
    pub ratings: Vec<SourceRating>,
}

impl CatalogItem {
    /// True when the genre text contains any of `genres` as a case-insensitive substring
    pub fn matches_any_genre<S: AsRef<str>>(&self, genres: &[S]) -> bool {
        let movie_genres = self.genre.as_deref().unwrap_or_default().to_lowercase();
        genres
            .iter()
            .any(|g| movie_genres.contains(&g.as_ref().to_lowercase()))
    }

    /// Poster URL, treating the catalog's "N/A" placeholder as absent
    pub fn poster_url(&self) -> Option<&str> {
        self.poster.as_deref().filter(|p| *p != "N/A")
    }
}

/// Outcome of a detail lookup
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Detail {
    Found(Box<CatalogItem>),
    /// The catalog answered with its negative-response marker
    NotFound(String),
}

impl Detail {
    pub fn into_item(self) -> Option<CatalogItem> {
        match self {
            Detail::Found(item) => Some(*item),
            Detail::NotFound(_) => None,
        }
    }
}
