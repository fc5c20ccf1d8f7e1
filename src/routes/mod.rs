use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

pub mod movies;
pub mod recommendations;
pub mod state;
pub mod users;
pub mod watched;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/search", get(movies::search))
        .route("/movies/:imdb_id", get(movies::detail))
        .route("/users", post(users::signup))
        .route("/users/:email/preferences", get(users::preferences))
        .route("/users/:email/settings", put(users::save_settings))
        .route("/users/:email/recommendations", get(recommendations::recommend))
        .route(
            "/users/:email/recommendations/latest",
            get(recommendations::latest),
        )
        .route(
            "/users/:email/watched",
            get(watched::list).post(watched::add),
        )
        .route("/users/:email/watched/status", get(watched::status))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "catalog_configured": state.catalog_configured(),
            "profile_store": state.profiles.store_name(),
        })),
    )
}
