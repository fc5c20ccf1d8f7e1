use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppResult,
    models::{WatchOutcome, WatchedMovie, WatchedMovieRequest},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    imdb_id: Option<String>,
    movie_id: Option<i64>,
}

/// Handler for a user's watch history
pub async fn list(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<WatchedMovie>>> {
    let movies = state.profiles.list_watched(&email).await?;
    Ok(Json(movies))
}

/// Handler for marking a title as watched
pub async fn add(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(movie): Json<WatchedMovieRequest>,
) -> AppResult<(StatusCode, Json<WatchOutcome>)> {
    let outcome = state.profiles.add_watched(&email, movie).await?;
    let status = match outcome {
        WatchOutcome::Added { .. } => StatusCode::CREATED,
        WatchOutcome::AlreadyWatched { .. } => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

/// Handler for checking a single title
pub async fn status(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Query(params): Query<StatusQuery>,
) -> AppResult<Json<Value>> {
    let watched = state
        .profiles
        .is_watched(&email, params.imdb_id.as_deref(), params.movie_id)
        .await?;
    Ok(Json(json!({ "watched": watched })))
}
