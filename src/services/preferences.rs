use crate::{models::GenrePreferenceSet, services::profile::ProfileRepository};

/// Resolves the genres a user's feed is built from
///
/// Looks up the user by email, then their preference row. A missing user,
/// missing row, empty or malformed value, or any store failure resolves to
/// the default genre list. This never fails.
#[tracing::instrument(skip(repository))]
pub async fn resolve_genres(repository: &ProfileRepository, email: &str) -> GenrePreferenceSet {
    let user_id = match repository.find_user_id(email).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => {
            tracing::debug!("No profile for email, using default genres");
            return GenrePreferenceSet::defaults();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile lookup failed, using default genres");
            return GenrePreferenceSet::defaults();
        }
    };

    let row = match repository.preferences_row(user_id).await {
        Ok(row) => row,
        Err(e) => {
            tracing::warn!(user_id = user_id, error = %e, "Preference lookup failed, using default genres");
            return GenrePreferenceSet::defaults();
        }
    };

    row.and_then(|row| row.preferences)
        .as_ref()
        .and_then(GenrePreferenceSet::from_stored)
        .unwrap_or_else(|| {
            tracing::debug!(user_id = user_id, "Stored preferences unusable, using default genres");
            GenrePreferenceSet::defaults()
        })
}
