use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `user_info` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: i64,
    pub user_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
}

/// Row of the `movie_preferences` collection, one per user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePreferencesRow {
    pub user_id: i64,
    #[serde(default)]
    pub child_account: bool,
    #[serde(default)]
    pub movies_watched_id: Option<i64>,
    /// Free-form text, normally a JSON-encoded genre list
    #[serde(default)]
    pub preferences: Option<serde_json::Value>,
}

/// Row of the `movies` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieRow {
    pub movie_id: i64,
    pub title: String,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

/// Row of the `user_watched_movies` collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchedRow {
    pub id: i64,
    pub user_id: i64,
    pub movie_id: i64,
    #[serde(default)]
    pub watched_at: Option<DateTime<Utc>>,
}

/// Signup payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Account settings update; absent fields fall back to their defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub child_account: Option<bool>,
    #[serde(default)]
    pub movies_watched_id: Option<i64>,
    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

/// A title the user marks as watched, shaped like a catalog record
#[derive(Debug, Clone, Deserialize)]
pub struct WatchedMovieRequest {
    #[serde(alias = "Title")]
    pub title: Option<String>,
    #[serde(alias = "Released")]
    pub released: Option<String>,
    #[serde(alias = "Plot")]
    pub description: Option<String>,
    #[serde(alias = "imdbID", alias = "imdbId")]
    pub imdb_id: Option<String>,
}

impl WatchedMovieRequest {
    pub fn title_or_unknown(&self) -> String {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Unknown")
            .to_string()
    }
}

/// Result of adding a watched title
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WatchOutcome {
    Added { movie_id: i64, watched: WatchedRow },
    AlreadyWatched { movie_id: i64, watched: WatchedRow },
}

/// A watched title shaped for display
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WatchedMovie {
    pub title: String,
    pub year: String,
    pub poster: Option<String>,
    pub imdb_id: Option<String>,
    pub movie_id: i64,
    pub watched_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

impl WatchedMovie {
    pub fn from_rows(watch: &WatchedRow, movie: &MovieRow) -> Self {
        Self {
            title: movie.title.clone(),
            year: movie
                .released
                .as_deref()
                .and_then(release_year)
                .map(|y| y.to_string())
                .unwrap_or_default(),
            poster: None,
            imdb_id: movie.imdb_id.clone(),
            movie_id: movie.movie_id,
            watched_at: watch.watched_at,
            description: movie.description.clone(),
        }
    }
}

/// Year of a stored release date; accepts ISO dates and the catalog's "16 Jul 2010" form
fn release_year(released: &str) -> Option<i32> {
    let released = released.trim();
    NaiveDate::parse_from_str(released, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(released, "%d %b %Y"))
        .map(|d| d.year())
        .ok()
}
