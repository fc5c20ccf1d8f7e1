use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{AppError, AppResult},
    models::GenrePreferenceSet,
    services::{resolve_genres, PassOutcome, RecommendationResult},
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub genres: Option<GenrePreferenceSet>,
    #[serde(flatten)]
    pub result: RecommendationResult,
}

/// Handler that runs a fresh recommendation pass for the user
///
/// A newer request for the same user cancels this one; the cancelled request
/// answers 409 and its partial results are discarded. Emails without a
/// profile still get a feed built from the default genres, but it is not
/// kept for `/latest`.
pub async fn recommend(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<RecommendationResponse>> {
    let aggregator = state.aggregator()?;
    let genres = resolve_genres(&state.profiles, &email).await;

    let ticket = match registered_user(&state, &email).await {
        Some(user_id) => Some(state.feeds.begin(user_id).await),
        None => None,
    };
    let standalone = CancellationToken::new();
    let token = ticket.as_ref().map_or(&standalone, |ticket| ticket.token());

    match aggregator.recommend(genres.as_slice(), token).await {
        PassOutcome::Complete(result) => {
            if let Some(ticket) = &ticket {
                state.feeds.apply(ticket, result.clone()).await;
            }
            Ok(Json(RecommendationResponse {
                genres: Some(genres),
                result,
            }))
        }
        PassOutcome::Cancelled => Err(AppError::Conflict(
            "Superseded by a newer recommendation request".to_string(),
        )),
    }
}

/// Handler for the last feed produced for the user
pub async fn latest(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<RecommendationResponse>> {
    let no_feed = || AppError::NotFound(format!("No recommendations yet for {}", email));

    let user_id = state.profiles.find_user_id(&email).await?.ok_or_else(no_feed)?;
    let result = state.feeds.latest(user_id).await.ok_or_else(no_feed)?;

    Ok(Json(RecommendationResponse {
        genres: None,
        result,
    }))
}

async fn registered_user(state: &AppState, email: &str) -> Option<i64> {
    match state.profiles.find_user_id(email).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::warn!(error = %e, "Profile lookup failed, feed will not be kept");
            None
        }
    }
}
