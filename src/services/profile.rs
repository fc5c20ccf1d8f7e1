use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::{
    db::{ProfileStore, Query, Table},
    error::{AppError, AppResult},
    models::{
        Detail, GenrePreferenceSet, MoviePreferencesRow, MovieRow, NewProfile, SettingsUpdate,
        UserInfo, WatchOutcome, WatchedMovie, WatchedMovieRequest, WatchedRow,
    },
    services::providers::CatalogProvider,
};

/// Typed access to user profiles, settings and watch history
///
/// All reads and writes go through a [`ProfileStore`] backend. The optional
/// catalog is only used to decorate watched titles for display.
#[derive(Clone)]
pub struct ProfileRepository {
    store: Arc<dyn ProfileStore>,
    catalog: Option<Arc<dyn CatalogProvider>>,
}

fn decode<T: DeserializeOwned>(table: Table, row: Value) -> AppResult<T> {
    serde_json::from_value(row)
        .map_err(|e| AppError::Internal(format!("Malformed {} row: {}", table, e)))
}

fn first_row<T: DeserializeOwned>(table: Table, rows: Vec<Value>) -> AppResult<Option<T>> {
    rows.into_iter().next().map(|row| decode(table, row)).transpose()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ProfileRepository {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self {
            store,
            catalog: None,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    /// Creates the user row and its empty preference row
    #[tracing::instrument(skip(self, profile), fields(email = %profile.email))]
    pub async fn signup(&self, profile: NewProfile) -> AppResult<UserInfo> {
        let email = non_blank(Some(profile.email.as_str()))
            .ok_or_else(|| AppError::InvalidInput("email required".to_string()))?;

        let rows = self
            .store
            .insert(
                Table::UserInfo,
                vec![json!({
                    "user_name": email,
                    "first_name": non_blank(profile.first_name.as_deref()),
                    "last_name": non_blank(profile.last_name.as_deref()),
                    "email": email,
                })],
            )
            .await?;
        let user: UserInfo = first_row(Table::UserInfo, rows)?
            .ok_or_else(|| AppError::Internal("Could not create user_info row".to_string()))?;

        self.store
            .upsert(
                Table::MoviePreferences,
                vec![json!({
                    "user_id": user.id,
                    "child_account": false,
                    "movies_watched_id": null,
                    "preferences": "{}",
                })],
                "user_id",
            )
            .await?;

        tracing::info!(user_id = user.id, store = self.store.name(), "Profile created");
        Ok(user)
    }

    pub async fn find_user_id(&self, email: &str) -> AppResult<Option<i64>> {
        let rows = self
            .store
            .select(Query::from(Table::UserInfo).eq("email", email).limit(1))
            .await?;
        Ok(first_row::<UserInfo>(Table::UserInfo, rows)?.map(|user| user.id))
    }

    async fn require_user_id(&self, email: &str) -> AppResult<i64> {
        self.find_user_id(email).await?.ok_or_else(|| {
            AppError::NotFound(format!("user_info row not found for {}", email))
        })
    }

    /// The stored preference row for a user, if one exists
    pub async fn preferences_row(&self, user_id: i64) -> AppResult<Option<MoviePreferencesRow>> {
        let rows = self
            .store
            .select(
                Query::from(Table::MoviePreferences)
                    .eq("user_id", user_id)
                    .limit(1),
            )
            .await?;
        first_row(Table::MoviePreferences, rows)
    }

    /// Writes account settings; a provided genre list replaces the stored one
    #[tracing::instrument(skip(self, update))]
    pub async fn save_settings(
        &self,
        email: &str,
        update: SettingsUpdate,
    ) -> AppResult<MoviePreferencesRow> {
        let user_id = self.require_user_id(email).await?;

        let mut row = json!({ "user_id": user_id });
        if let Some(child_account) = update.child_account {
            row["child_account"] = Value::Bool(child_account);
        }
        if let Some(movies_watched_id) = update.movies_watched_id {
            row["movies_watched_id"] = Value::from(movies_watched_id);
        }
        if let Some(genres) = update.genres {
            let stored = GenrePreferenceSet::from_names(&genres)
                .map(|set| set.to_stored())
                .unwrap_or_else(|| "[]".to_string());
            row["preferences"] = Value::String(stored);
        }

        let rows = self
            .store
            .upsert(Table::MoviePreferences, vec![row], "user_id")
            .await?;
        first_row(Table::MoviePreferences, rows)?
            .ok_or_else(|| AppError::Internal("Preference upsert returned no row".to_string()))
    }

    async fn find_movie(&self, title: &str, released: Option<&str>) -> AppResult<Option<i64>> {
        let rows = self
            .store
            .select(
                Query::from(Table::Movies)
                    .eq("title", title)
                    .eq("released", released)
                    .limit(1),
            )
            .await?;
        Ok(first_row::<MovieRow>(Table::Movies, rows)?.map(|movie| movie.movie_id))
    }

    /// Finds the catalog title in `movies`, inserting it when absent
    async fn resolve_movie_id(&self, movie: &WatchedMovieRequest) -> AppResult<i64> {
        let title = movie.title_or_unknown();
        let released = non_blank(movie.released.as_deref());
        let imdb_id = non_blank(movie.imdb_id.as_deref());

        if imdb_id.is_some() {
            let rows = self
                .store
                .select(Query::from(Table::Movies).eq("title", title.as_str()).limit(1))
                .await?;
            if let Some(existing) = first_row::<MovieRow>(Table::Movies, rows)? {
                return Ok(existing.movie_id);
            }
        }

        if let Some(movie_id) = self.find_movie(&title, released).await? {
            return Ok(movie_id);
        }

        let inserted = self
            .store
            .insert(
                Table::Movies,
                vec![json!({
                    "title": title,
                    "released": released,
                    "description": non_blank(movie.description.as_deref()),
                    "imdb_id": imdb_id,
                })],
            )
            .await;

        match inserted {
            Ok(rows) => first_row::<MovieRow>(Table::Movies, rows)?
                .map(|movie| movie.movie_id)
                .ok_or_else(|| AppError::Internal("Could not determine movie_id".to_string())),
            Err(insert_error) => {
                // A concurrent writer may have created the row first
                tracing::warn!(title = %title, error = %insert_error, "Movie insert failed, re-checking");
                match self.find_movie(&title, released).await {
                    Ok(Some(movie_id)) => Ok(movie_id),
                    _ => Err(insert_error),
                }
            }
        }
    }

    async fn existing_watch(&self, user_id: i64, movie_id: i64) -> AppResult<Option<WatchedRow>> {
        let rows = self
            .store
            .select(
                Query::from(Table::UserWatchedMovies)
                    .eq("user_id", user_id)
                    .eq("movie_id", movie_id)
                    .limit(1),
            )
            .await?;
        first_row(Table::UserWatchedMovies, rows)
    }

    /// Records that the user watched a title; repeated adds are reported, not duplicated
    #[tracing::instrument(skip(self, movie))]
    pub async fn add_watched(
        &self,
        email: &str,
        movie: WatchedMovieRequest,
    ) -> AppResult<WatchOutcome> {
        let user_id = self.require_user_id(email).await?;
        let movie_id = self.resolve_movie_id(&movie).await?;

        if let Some(watched) = self.existing_watch(user_id, movie_id).await? {
            return Ok(WatchOutcome::AlreadyWatched { movie_id, watched });
        }

        let rows = self
            .store
            .insert(
                Table::UserWatchedMovies,
                vec![json!({ "user_id": user_id, "movie_id": movie_id })],
            )
            .await?;
        let watched: WatchedRow = first_row(Table::UserWatchedMovies, rows)?
            .ok_or_else(|| AppError::Internal("Watch insert returned no row".to_string()))?;

        tracing::info!(user_id = user_id, movie_id = movie_id, "Title marked as watched");
        Ok(WatchOutcome::Added { movie_id, watched })
    }

    /// Watch history, most recent first
    pub async fn list_watched(&self, email: &str) -> AppResult<Vec<WatchedMovie>> {
        let user_id = self.require_user_id(email).await?;

        let rows = self
            .store
            .select(
                Query::from(Table::UserWatchedMovies)
                    .eq("user_id", user_id)
                    .order_desc("watched_at"),
            )
            .await?;

        let mut watched = Vec::with_capacity(rows.len());
        for row in rows {
            let watch: WatchedRow = decode(Table::UserWatchedMovies, row)?;
            let movies = self
                .store
                .select(
                    Query::from(Table::Movies)
                        .eq("movie_id", watch.movie_id)
                        .limit(1),
                )
                .await?;
            let Some(movie) = first_row::<MovieRow>(Table::Movies, movies)? else {
                tracing::warn!(movie_id = watch.movie_id, "Watched row points at a missing movie");
                continue;
            };

            let mut shaped = WatchedMovie::from_rows(&watch, &movie);
            self.decorate(&mut shaped).await;
            watched.push(shaped);
        }

        Ok(watched)
    }

    /// Fills poster, title and year from the catalog; failures leave the stored values
    async fn decorate(&self, shaped: &mut WatchedMovie) {
        let (Some(catalog), Some(imdb_id)) = (&self.catalog, shaped.imdb_id.as_deref()) else {
            return;
        };

        let item = match catalog.fetch_detail(imdb_id).await {
            Ok(Detail::Found(item)) => item,
            Ok(Detail::NotFound(_)) => return,
            Err(e) => {
                tracing::debug!(imdb_id = %imdb_id, error = %e, "Watched title enrichment failed");
                return;
            }
        };

        if let Some(poster) = item.poster_url() {
            shaped.poster = Some(poster.to_string());
        }
        if !item.title.is_empty() {
            shaped.title = item.title.clone();
        }
        if let Some(year) = item.year.as_deref().filter(|y| !y.is_empty()) {
            shaped.year = year.to_string();
        }
    }

    /// Whether the user has watched a title, identified by catalog id or stored movie id
    pub async fn is_watched(
        &self,
        email: &str,
        imdb_id: Option<&str>,
        movie_id: Option<i64>,
    ) -> AppResult<bool> {
        let user_id = self.require_user_id(email).await?;

        let movie_id = match (movie_id, non_blank(imdb_id)) {
            (Some(movie_id), _) => movie_id,
            (None, Some(imdb_id)) => {
                let rows = self
                    .store
                    .select(Query::from(Table::Movies).eq("imdb_id", imdb_id).limit(1))
                    .await?;
                match first_row::<MovieRow>(Table::Movies, rows)? {
                    Some(movie) => movie.movie_id,
                    None => return Ok(false),
                }
            }
            (None, None) => return Ok(false),
        };

        Ok(self.existing_watch(user_id, movie_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::CatalogItem;
    use crate::services::providers::MockCatalogProvider;

    fn repository() -> ProfileRepository {
        ProfileRepository::new(Arc::new(MemoryStore::new()))
    }

    fn new_profile(email: &str) -> NewProfile {
        NewProfile {
            email: email.to_string(),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    fn heat() -> WatchedMovieRequest {
        WatchedMovieRequest {
            title: Some("Heat".to_string()),
            released: Some("15 Dec 1995".to_string()),
            description: Some("A group of high-end professional thieves...".to_string()),
            imdb_id: Some("tt0113277".to_string()),
        }
    }

    #[tokio::test]
    async fn test_signup_creates_user_and_empty_preferences() {
        let repo = repository();
        let user = repo.signup(new_profile("ada@example.com")).await.unwrap();

        assert_eq!(user.user_name, "ada@example.com");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(repo.find_user_id("ada@example.com").await.unwrap(), Some(user.id));

        let prefs = repo.preferences_row(user.id).await.unwrap().unwrap();
        assert!(!prefs.child_account);
        assert_eq!(prefs.preferences, Some(json!("{}")));
    }

    #[tokio::test]
    async fn test_signup_requires_email() {
        let result = repository().signup(new_profile("  ")).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts() {
        let repo = repository();
        repo.signup(new_profile("ada@example.com")).await.unwrap();
        let result = repo.signup(new_profile("ada@example.com")).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_save_settings_replaces_genres_and_keeps_flags() {
        let repo = repository();
        let user = repo.signup(new_profile("ada@example.com")).await.unwrap();

        repo.save_settings(
            "ada@example.com",
            SettingsUpdate {
                child_account: Some(true),
                genres: Some(vec!["Drama".to_string(), "Horror".to_string()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let row = repo
            .save_settings(
                "ada@example.com",
                SettingsUpdate {
                    genres: Some(vec!["Comedy".to_string(), " Comedy ".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(row.user_id, user.id);
        assert!(row.child_account);
        assert_eq!(row.preferences, Some(json!("[\"Comedy\"]")));
    }

    #[tokio::test]
    async fn test_save_settings_for_unknown_user_is_not_found() {
        let result = repository()
            .save_settings("ghost@example.com", SettingsUpdate::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_add_watched_twice_reports_already_watched() {
        let repo = repository();
        repo.signup(new_profile("ada@example.com")).await.unwrap();

        let first = repo.add_watched("ada@example.com", heat()).await.unwrap();
        let WatchOutcome::Added { movie_id, .. } = first else {
            panic!("expected a new watch entry, got {:?}", first);
        };

        let second = repo.add_watched("ada@example.com", heat()).await.unwrap();
        assert!(matches!(
            second,
            WatchOutcome::AlreadyWatched { movie_id: again, .. } if again == movie_id
        ));
        assert_eq!(repo.list_watched("ada@example.com").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_watched_reuses_movie_rows_across_users() {
        let repo = repository();
        repo.signup(new_profile("ada@example.com")).await.unwrap();
        repo.signup(new_profile("bob@example.com")).await.unwrap();

        let a = repo.add_watched("ada@example.com", heat()).await.unwrap();
        let b = repo.add_watched("bob@example.com", heat()).await.unwrap();

        match (a, b) {
            (WatchOutcome::Added { movie_id: x, .. }, WatchOutcome::Added { movie_id: y, .. }) => {
                assert_eq!(x, y)
            }
            other => panic!("unexpected outcomes {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_untitled_movie_is_stored_as_unknown() {
        let repo = repository();
        repo.signup(new_profile("ada@example.com")).await.unwrap();

        let movie = WatchedMovieRequest {
            title: None,
            released: None,
            description: None,
            imdb_id: None,
        };
        repo.add_watched("ada@example.com", movie).await.unwrap();

        let watched = repo.list_watched("ada@example.com").await.unwrap();
        assert_eq!(watched[0].title, "Unknown");
        assert_eq!(watched[0].year, "");
    }

    #[tokio::test]
    async fn test_is_watched_by_imdb_id_and_movie_id() {
        let repo = repository();
        repo.signup(new_profile("ada@example.com")).await.unwrap();

        assert!(!repo
            .is_watched("ada@example.com", Some("tt0113277"), None)
            .await
            .unwrap());

        let WatchOutcome::Added { movie_id, .. } =
            repo.add_watched("ada@example.com", heat()).await.unwrap()
        else {
            panic!("expected a new watch entry");
        };

        assert!(repo
            .is_watched("ada@example.com", Some("tt0113277"), None)
            .await
            .unwrap());
        assert!(repo
            .is_watched("ada@example.com", None, Some(movie_id))
            .await
            .unwrap());
        assert!(!repo.is_watched("ada@example.com", None, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_watched_is_enriched_from_catalog() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_fetch_detail().returning(|id| {
            let item: CatalogItem = serde_json::from_value(json!({
                "imdbID": id,
                "Title": "Heat (1995)",
                "Year": "1995",
                "Poster": "https://img.example/heat.jpg",
            }))
            .unwrap();
            Ok(Detail::Found(Box::new(item)))
        });

        let repo = repository().with_catalog(Arc::new(catalog));
        repo.signup(new_profile("ada@example.com")).await.unwrap();
        repo.add_watched("ada@example.com", heat()).await.unwrap();

        let watched = repo.list_watched("ada@example.com").await.unwrap();
        assert_eq!(watched[0].title, "Heat (1995)");
        assert_eq!(watched[0].poster.as_deref(), Some("https://img.example/heat.jpg"));
    }

    #[tokio::test]
    async fn test_list_watched_ignores_catalog_failures() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_fetch_detail()
            .returning(|_| Err(AppError::ExternalApi("down".to_string())));

        let repo = repository().with_catalog(Arc::new(catalog));
        repo.signup(new_profile("ada@example.com")).await.unwrap();
        repo.add_watched("ada@example.com", heat()).await.unwrap();

        let watched = repo.list_watched("ada@example.com").await.unwrap();
        assert_eq!(watched[0].title, "Heat");
        assert_eq!(watched[0].year, "1995");
        assert_eq!(watched[0].poster, None);
    }
}
