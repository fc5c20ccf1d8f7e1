use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{CatalogItem, SearchPage},
    services::title_search,
};

use super::AppState;

fn first_page() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default = "first_page")]
    page: u32,
}

/// Handler for keyword search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchPage>> {
    let results = title_search::search_titles(state.catalog()?, &params.q, params.page).await?;
    Ok(Json(results))
}

/// Handler for a single title's details
pub async fn detail(
    State(state): State<AppState>,
    Path(imdb_id): Path<String>,
) -> AppResult<Json<CatalogItem>> {
    let item = title_search::title_detail(state.catalog()?, &imdb_id).await?;
    Ok(Json(item))
}
