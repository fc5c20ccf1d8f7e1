use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    error::AppResult,
    models::{GenrePreferenceSet, MoviePreferencesRow, NewProfile, SettingsUpdate, UserInfo},
    services::resolve_genres,
};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub email: String,
    pub genres: GenrePreferenceSet,
}

/// Handler for account creation
pub async fn signup(
    State(state): State<AppState>,
    Json(profile): Json<NewProfile>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    let user = state.profiles.signup(profile).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for the genres a user's feed is built from
pub async fn preferences(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Json<PreferencesResponse> {
    let genres = resolve_genres(&state.profiles, &email).await;
    Json(PreferencesResponse { email, genres })
}

/// Handler for account settings
pub async fn save_settings(
    State(state): State<AppState>,
    Path(email): Path<String>,
    Json(update): Json<SettingsUpdate>,
) -> AppResult<Json<MoviePreferencesRow>> {
    let row = state.profiles.save_settings(&email, update).await?;
    Ok(Json(row))
}
