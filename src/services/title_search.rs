use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogItem, Detail, SearchPage},
    services::providers::CatalogProvider,
};

/// Keyword search for the browse page
///
/// Validates the query, delegates to the catalog and collapses repeated
/// identifiers (first occurrence wins). Results without an identifier are
/// dropped.
pub async fn search_titles(
    catalog: &dyn CatalogProvider,
    query: &str,
    page: u32,
) -> AppResult<SearchPage> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Search query must not be empty".to_string()));
    }
    if page == 0 {
        return Err(AppError::InvalidInput("Page numbers start at 1".to_string()));
    }

    let mut results = catalog.search(query, page).await?;
    let mut seen = HashSet::new();
    results
        .items
        .retain(|summary| summary.id().is_some_and(|id| seen.insert(id.to_string())));

    Ok(results)
}

/// Full record for one title; a catalog miss becomes `NotFound`
pub async fn title_detail(catalog: &dyn CatalogProvider, imdb_id: &str) -> AppResult<CatalogItem> {
    match catalog.fetch_detail(imdb_id.trim()).await? {
        Detail::Found(item) => Ok(*item),
        Detail::NotFound(reason) => Err(AppError::NotFound(format!("{}: {}", imdb_id, reason))),
    }
}
