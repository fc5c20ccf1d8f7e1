use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use movie_feed_api::{
    db::MemoryStore,
    error::AppResult,
    models::{CatalogItem, CatalogSummary, Detail, SearchPage},
    routes::{create_router, AppState},
    services::{
        interval_gates, CatalogProvider, ProfileRepository, RecommendationAggregator,
    },
};

/// Catalog where every title is a comedy-drama
struct FakeCatalog;

fn summary(id: &str) -> CatalogSummary {
    CatalogSummary {
        title: format!("Movie {}", id),
        year: Some("1999".to_string()),
        imdb_id: Some(id.to_string()),
        item_type: Some("movie".to_string()),
        poster: Some("N/A".to_string()),
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    async fn search(&self, keyword: &str, page: u32) -> AppResult<SearchPage> {
        let ids = [
            format!("tt-{}-{}-a", keyword, page),
            format!("tt-{}-{}-b", keyword, page),
            format!("tt-{}-{}-a", keyword, page),
        ];
        Ok(SearchPage {
            items: ids.iter().map(|id| summary(id)).collect(),
            ok: true,
            total_results: Some(3),
        })
    }

    async fn fetch_detail(&self, id: &str) -> AppResult<Detail> {
        if id == "tt404" {
            return Ok(Detail::NotFound("Incorrect IMDb ID.".to_string()));
        }
        let item: CatalogItem = serde_json::from_value(json!({
            "imdbID": id,
            "Title": format!("Movie {}", id),
            "Year": "1999",
            "Genre": "Comedy, Drama",
            "Poster": "https://img.example/poster.jpg",
        }))
        .unwrap();
        Ok(Detail::Found(Box::new(item)))
    }

    fn has_api_key(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

fn create_test_state() -> AppState {
    let catalog: Arc<dyn CatalogProvider> = Arc::new(FakeCatalog);
    let profiles =
        ProfileRepository::new(Arc::new(MemoryStore::new())).with_catalog(catalog.clone());
    let aggregator =
        RecommendationAggregator::new(catalog.clone(), interval_gates(Duration::ZERO))
            .unwrap()
            .with_target_count(4)
            .with_seed(11);

    AppState::new(Some(catalog), profiles, 4).with_aggregator(aggregator)
}

fn create_test_server() -> TestServer {
    TestServer::new(create_router(create_test_state())).unwrap()
}

fn create_server_without_catalog() -> TestServer {
    let profiles = ProfileRepository::new(Arc::new(MemoryStore::new()));
    let state = AppState::new(None, profiles, 15);
    TestServer::new(create_router(state)).unwrap()
}

async fn signup(server: &TestServer, email: &str) {
    server
        .post("/api/v1/users")
        .json(&json!({ "email": email, "first_name": "Ada" }))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["catalog_configured"], true);
    assert_eq!(body["profile_store"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = create_test_server();
    let response = server
        .get("/health")
        .add_header(
            "x-request-id".parse::<axum::http::HeaderName>().unwrap(),
            "trace-me".parse::<axum::http::HeaderValue>().unwrap(),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-me");
}

#[tokio::test]
async fn test_missing_api_key_is_reported_once_per_request() {
    let server = create_server_without_catalog();

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["catalog_configured"], false);

    let response = server
        .get("/api/v1/movies/search")
        .add_query_param("q", "alien")
        .await;
    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("OMDB_API_KEY"));

    server
        .get("/api/v1/users/ada@example.com/recommendations")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_search_dedupes_results() {
    let server = create_test_server();
    let response = server
        .get("/api/v1/movies/search")
        .add_query_param("q", "alien")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["imdbID"], "tt-alien-1-a");
}

#[tokio::test]
async fn test_search_rejects_blank_query() {
    let server = create_test_server();
    server
        .get("/api/v1/movies/search")
        .add_query_param("q", " ")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_movie_detail_and_miss() {
    let server = create_test_server();

    let response = server.get("/api/v1/movies/tt0078748").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["imdbID"], "tt0078748");
    assert_eq!(body["Genre"], "Comedy, Drama");

    server
        .get("/api/v1/movies/tt404")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_and_duplicate() {
    let server = create_test_server();
    let response = server
        .post("/api/v1/users")
        .json(&json!({ "email": "ada@example.com" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user_name"], "ada@example.com");

    server
        .post("/api/v1/users")
        .json(&json!({ "email": "ada@example.com" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_preferences_default_then_saved() {
    let server = create_test_server();
    signup(&server, "ada@example.com").await;

    let body: Value = server
        .get("/api/v1/users/ada@example.com/preferences")
        .await
        .json();
    assert_eq!(body["genres"].as_array().unwrap().len(), 10);

    server
        .put("/api/v1/users/ada@example.com/settings")
        .json(&json!({ "child_account": true, "genres": ["Comedy", "Horror"] }))
        .await
        .assert_status_ok();

    let body: Value = server
        .get("/api/v1/users/ada@example.com/preferences")
        .await
        .json();
    assert_eq!(body["genres"], json!(["Comedy", "Horror"]));
}

#[tokio::test]
async fn test_settings_for_unknown_user() {
    let server = create_test_server();
    server
        .put("/api/v1/users/ghost@example.com/settings")
        .json(&json!({ "genres": ["Drama"] }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_then_latest() {
    let server = create_test_server();
    signup(&server, "ada@example.com").await;
    server
        .put("/api/v1/users/ada@example.com/settings")
        .json(&json!({ "genres": ["Comedy"] }))
        .await
        .assert_status_ok();

    server
        .get("/api/v1/users/ada@example.com/recommendations/latest")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let response = server
        .get("/api/v1/users/ada@example.com/recommendations")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["genres"], json!(["Comedy"]));

    let items = body["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.len() <= 4);
    assert!(items
        .iter()
        .all(|i| i["Genre"].as_str().unwrap().contains("Comedy")));

    let latest: Value = server
        .get("/api/v1/users/ada@example.com/recommendations/latest")
        .await
        .json();
    assert_eq!(latest["items"], body["items"]);
}

#[tokio::test]
async fn test_unknown_users_get_a_feed_that_is_not_kept() {
    let state = create_test_state();
    let server = TestServer::new(create_router(state.clone())).unwrap();

    for i in 0..20 {
        let response = server
            .get(&format!("/api/v1/users/stranger-{}@example.com/recommendations", i))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["genres"].as_array().unwrap().len(), 10);
    }
    assert!(state.feeds.is_empty().await);

    server
        .get("/api/v1/users/stranger-0@example.com/recommendations/latest")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    signup(&server, "ada@example.com").await;
    server
        .get("/api/v1/users/ada@example.com/recommendations")
        .await
        .assert_status_ok();
    assert_eq!(state.feeds.len().await, 1);
}

#[tokio::test]
async fn test_watched_flow() {
    let server = create_test_server();
    signup(&server, "ada@example.com").await;

    let movie = json!({
        "Title": "Heat",
        "Released": "15 Dec 1995",
        "Plot": "A group of high-end professional thieves...",
        "imdbID": "tt0113277"
    });

    let response = server
        .post("/api/v1/users/ada@example.com/watched")
        .json(&movie)
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["status"], "added");

    let response = server
        .post("/api/v1/users/ada@example.com/watched")
        .json(&movie)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "already_watched");

    let list: Vec<Value> = server
        .get("/api/v1/users/ada@example.com/watched")
        .await
        .json();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["imdb_id"], "tt0113277");
    assert_eq!(list[0]["poster"], "https://img.example/poster.jpg");

    let status: Value = server
        .get("/api/v1/users/ada@example.com/watched/status")
        .add_query_param("imdb_id", "tt0113277")
        .await
        .json();
    assert_eq!(status["watched"], true);

    let status: Value = server
        .get("/api/v1/users/ada@example.com/watched/status")
        .add_query_param("imdb_id", "tt0000001")
        .await
        .json();
    assert_eq!(status["watched"], false);
}
