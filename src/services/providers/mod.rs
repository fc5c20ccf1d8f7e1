/// Movie catalog provider abstraction
///
/// The catalog is a remote read-only HTTP API offering keyword search and
/// fetch-by-identifier. It has no genre filter, which is why recommendations
/// are assembled from search + detail calls (see `services::recommendations`).
use crate::{
    error::AppResult,
    models::{Detail, SearchPage},
};

pub mod omdb;

pub use omdb::OmdbProvider;

/// Trait for movie catalog providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Search for titles by keyword, one page at a time (pages start at 1)
    async fn search(&self, keyword: &str, page: u32) -> AppResult<SearchPage>;

    /// Fetch the full record for one identifier
    ///
    /// A catalog-level "not found" is `Ok(Detail::NotFound)`, not an error.
    async fn fetch_detail(&self, id: &str) -> AppResult<Detail>;

    /// Capability probe: whether an API key is configured
    fn has_api_key(&self) -> bool;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
