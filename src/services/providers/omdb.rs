/// OMDb catalog provider
///
/// API Flow:
/// 1. Keyword search: `?apikey=…&s={keyword}&type=movie&page={n}` → summaries
/// 2. Detail: `?apikey=…&i={imdb_id}&plot=short` → full record
///
/// OMDb reports misses in-band with `"Response": "False"` and an `Error`
/// message, alongside HTTP 200.
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogSummary, Detail, SearchPage},
    services::providers::CatalogProvider,
};

const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
const DETAIL_CACHE_TTL: u64 = 604800; // 1 week

#[derive(Debug, Deserialize)]
struct OmdbSearchResponse {
    #[serde(rename = "Search", default)]
    search: Vec<CatalogSummary>,
    #[serde(rename = "totalResults", default)]
    total_results: Option<String>,
    #[serde(rename = "Response", default)]
    response: Option<String>,
}

#[derive(Clone)]
pub struct OmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl OmdbProvider {
    /// Creates a provider; a missing or blank API key is a configuration error
    pub fn new(
        api_key: Option<&str>,
        api_url: String,
        timeout: Duration,
        cache: Option<Cache>,
    ) -> AppResult<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::Configuration(
                    "OMDb API key not configured. Set OMDB_API_KEY to enable movie search and recommendations."
                        .to_string(),
                )
            })?;

        let http_client = HttpClient::builder().timeout(timeout).build()?;

        tracing::info!(
            api_url = %api_url,
            timeout_ms = timeout.as_millis() as u64,
            cached = cache.is_some(),
            "OMDb provider configured"
        );

        Ok(Self {
            http_client,
            api_key: api_key.to_string(),
            api_url,
            cache,
        })
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> AppResult<Value> {
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OMDb API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }
}

/// Whether an OMDb payload carries the negative-response marker
fn is_negative(value: &Value) -> bool {
    value.get("Response").and_then(Value::as_str) == Some("False")
}

fn decode_search(value: Value) -> AppResult<SearchPage> {
    if is_negative(&value) {
        return Ok(SearchPage::default());
    }

    let response: OmdbSearchResponse = serde_json::from_value(value)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDb search response: {}", e)))?;

    Ok(SearchPage {
        ok: response.response.as_deref() == Some("True"),
        total_results: response.total_results.and_then(|t| t.parse().ok()),
        items: response.search,
    })
}

fn decode_detail(value: Value) -> AppResult<Detail> {
    if is_negative(&value) {
        let reason = value
            .get("Error")
            .and_then(Value::as_str)
            .unwrap_or("Movie not found!")
            .to_string();
        return Ok(Detail::NotFound(reason));
    }

    let item: CatalogItem = serde_json::from_value(value)
        .map_err(|e| AppError::ExternalApi(format!("Failed to parse OMDb detail response: {}", e)))?;

    Ok(Detail::Found(Box::new(item)))
}

#[async_trait::async_trait]
impl CatalogProvider for OmdbProvider {
    async fn search(&self, keyword: &str, page: u32) -> AppResult<SearchPage> {
        let key = CacheKey::CatalogSearch {
            keyword: keyword.to_string(),
            page,
        };

        cached!(
            self.cache.as_ref(),
            key,
            SEARCH_CACHE_TTL,
            async move {
                let page_param = page.to_string();
                let value = self
                    .get_json(&[("s", keyword), ("type", "movie"), ("page", page_param.as_str())])
                    .await?;
                let results = decode_search(value)?;

                tracing::info!(
                    keyword = %keyword,
                    page = page,
                    results = results.items.len(),
                    provider = "omdb",
                    "Keyword search completed"
                );

                Ok::<_, AppError>(results)
            },
            |results: &SearchPage| results.ok
        )
    }

    async fn fetch_detail(&self, id: &str) -> AppResult<Detail> {
        cached!(
            self.cache.as_ref(),
            CacheKey::CatalogDetail(id.to_string()),
            DETAIL_CACHE_TTL,
            async move {
                let value = self.get_json(&[("i", id), ("plot", "short")]).await?;
                let detail = decode_detail(value)?;

                tracing::debug!(
                    imdb_id = %id,
                    found = matches!(detail, Detail::Found(_)),
                    provider = "omdb",
                    "Detail fetched"
                );

                Ok::<_, AppError>(detail)
            },
            |detail: &Detail| matches!(detail, Detail::Found(_))
        )
    }

    fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &'static str {
        "omdb"
    }
}
