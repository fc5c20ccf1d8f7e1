use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::StdRng, seq::IndexedRandom, Rng, SeedableRng};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, Detail},
    services::{providers::CatalogProvider, rate_gate::GateFactory},
};

pub const DEFAULT_TARGET_COUNT: usize = 15;
pub const ATTEMPTS_PER_GENRE: usize = 3;
/// Search results considered per attempt
pub const CANDIDATES_PER_SEARCH: usize = 3;
/// Search pages sampled (inclusive)
pub const MAX_SEARCH_PAGE: u32 = 3;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub const NO_MATCHES_MESSAGE: &str =
    "No movies found matching your preferences. Try adjusting your genre preferences.";

/// Keywords that surface a genre through plain keyword search
///
/// Unknown genres search for their own lowercased name.
pub fn search_keywords(genre: &str) -> Vec<String> {
    let known: &[&str] = match genre {
        "Action" => &["action", "adventure", "fight", "hero"],
        "Comedy" => &["comedy", "funny", "laugh"],
        "Drama" => &["drama", "story"],
        "Sci-Fi" => &["space", "future", "alien", "robot"],
        "Romance" => &["love", "romance", "romantic"],
        "Horror" => &["horror", "scary", "zombie"],
        "Thriller" => &["thriller", "suspense", "mystery"],
        "Family" => &["family", "kids", "children"],
        "Animation" => &["animation", "animated", "cartoon"],
        "Documentary" => &["documentary", "true", "history"],
        _ => return vec![genre.to_lowercase()],
    };
    known.iter().map(|k| k.to_string()).collect()
}

/// Titles collected by one aggregation pass
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationResult {
    pub items: Vec<CatalogItem>,
    pub attempts: usize,
    /// Informational note, set when the pass found nothing
    pub message: Option<String>,
}

impl RecommendationResult {
    fn finish(items: Vec<CatalogItem>, attempts: usize) -> Self {
        let message = items.is_empty().then(|| NO_MATCHES_MESSAGE.to_string());
        Self {
            items,
            attempts,
            message,
        }
    }
}

/// How a pass ended
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Complete(RecommendationResult),
    /// The caller abandoned the pass; nothing it gathered is reported
    Cancelled,
}

enum Guarded<T> {
    Done(AppResult<T>),
    Cancelled,
}

/// Builds a genre-matched feed from keyword search and detail fetches
///
/// Each attempt rotates to the next genre, searches one of its keywords on a
/// random page, and fetches details for up to three unseen results. A title
/// is kept when its genre text mentions any requested genre. The pass ends at
/// `target_count` titles or after `3 × genres` attempts. Failed calls are
/// logged and skipped. Every pass paces its detail fetches through its own
/// gate from `gates`, so concurrent passes never wait on each other.
pub struct RecommendationAggregator {
    catalog: Arc<dyn CatalogProvider>,
    gates: GateFactory,
    target_count: usize,
    call_timeout: Duration,
    seed: Option<u64>,
}

impl RecommendationAggregator {
    /// Fails with a configuration error when the catalog has no API key
    pub fn new(catalog: Arc<dyn CatalogProvider>, gates: GateFactory) -> AppResult<Self> {
        if !catalog.has_api_key() {
            return Err(AppError::Configuration(format!(
                "{} API key not configured; recommendations are unavailable",
                catalog.name()
            )));
        }

        Ok(Self {
            catalog,
            gates,
            target_count: DEFAULT_TARGET_COUNT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            seed: None,
        })
    }

    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Makes keyword and page selection reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Runs one aggregation pass
    ///
    /// Blank genre names are ignored. Once `cancel` fires, no further result
    /// is recorded and the pass reports `PassOutcome::Cancelled`, even if
    /// responses arrive later.
    #[tracing::instrument(skip_all, fields(genres = genres.len(), target = self.target_count))]
    pub async fn recommend(&self, genres: &[String], cancel: &CancellationToken) -> PassOutcome {
        if cancel.is_cancelled() {
            return PassOutcome::Cancelled;
        }

        let genres: Vec<&str> = genres
            .iter()
            .map(|g| g.trim())
            .filter(|g| !g.is_empty())
            .collect();
        if genres.is_empty() {
            return PassOutcome::Complete(RecommendationResult {
                items: Vec::new(),
                attempts: 0,
                message: None,
            });
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let gate = (self.gates)();
        let max_attempts = genres.len() * ATTEMPTS_PER_GENRE;
        let mut collected: Vec<CatalogItem> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut attempts = 0;

        while collected.len() < self.target_count && attempts < max_attempts {
            attempts += 1;

            let genre = genres[attempts % genres.len()];
            let keywords = search_keywords(genre);
            let Some(keyword) = keywords.choose(&mut rng) else {
                continue;
            };
            let page = rng.random_range(1..=MAX_SEARCH_PAGE);

            let results = match self.guarded(cancel, self.catalog.search(keyword, page)).await {
                Guarded::Cancelled => return PassOutcome::Cancelled,
                Guarded::Done(Ok(results)) => results,
                Guarded::Done(Err(e)) => {
                    tracing::warn!(
                        genre = %genre,
                        keyword = %keyword,
                        page = page,
                        error = %e,
                        "Catalog search failed"
                    );
                    continue;
                }
            };

            for summary in results.items.iter().take(CANDIDATES_PER_SEARCH) {
                if collected.len() >= self.target_count {
                    break;
                }
                let Some(id) = summary.id() else {
                    continue;
                };
                if seen.contains(id) {
                    continue;
                }

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return PassOutcome::Cancelled,
                    _ = gate.acquire() => {}
                }

                let item = match self.guarded(cancel, self.catalog.fetch_detail(id)).await {
                    Guarded::Cancelled => return PassOutcome::Cancelled,
                    Guarded::Done(Ok(Detail::Found(item))) => *item,
                    Guarded::Done(Ok(Detail::NotFound(reason))) => {
                        tracing::debug!(imdb_id = %id, reason = %reason, "Catalog has no detail");
                        continue;
                    }
                    Guarded::Done(Err(e)) => {
                        tracing::warn!(imdb_id = %id, error = %e, "Detail fetch failed");
                        continue;
                    }
                };

                if seen.contains(&item.imdb_id) || !item.matches_any_genre(&genres) {
                    continue;
                }

                if cancel.is_cancelled() {
                    return PassOutcome::Cancelled;
                }
                seen.insert(id.to_string());
                seen.insert(item.imdb_id.clone());
                collected.push(item);
            }
        }

        tracing::info!(
            attempts = attempts,
            collected = collected.len(),
            provider = self.catalog.name(),
            "Recommendation pass finished"
        );

        PassOutcome::Complete(RecommendationResult::finish(collected, attempts))
    }

    /// Awaits a catalog call under the per-call timeout, giving up as soon as `cancel` fires
    async fn guarded<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = AppResult<T>>,
    ) -> Guarded<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Guarded::Cancelled,
            outcome = tokio::time::timeout(self.call_timeout, call) => match outcome {
                Ok(result) => Guarded::Done(result),
                Err(_) => Guarded::Done(Err(AppError::ExternalApi(format!(
                    "catalog call timed out after {}ms",
                    self.call_timeout.as_millis()
                )))),
            },
        }
    }
}
