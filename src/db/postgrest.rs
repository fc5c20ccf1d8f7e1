/// REST-over-Postgres profile store (Supabase / PostgREST)
///
/// Request shapes:
/// - select: `GET {base}/rest/v1/{table}?select=*&{col}=eq.{value}&order={col}.desc&limit={n}`
/// - insert: `POST {base}/rest/v1/{table}` with `Prefer: return=representation`
/// - upsert: `POST {base}/rest/v1/{table}?on_conflict={col}` with
///   `Prefer: resolution=merge-duplicates,return=representation`
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::Value;

use crate::{
    db::store::{validate_rows, ProfileStore, Query, Table},
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct PostgrestStore {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Query-string pairs for a select
    fn query_params(query: &Query) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];

        for (column, value) in &query.filters {
            let filter = match value {
                Value::Null => "is.null".to_string(),
                Value::String(s) => format!("eq.{}", s),
                other => format!("eq.{}", other),
            };
            params.push((column.to_string(), filter));
        }

        if let Some(order) = &query.order {
            let direction = if order.descending { "desc" } else { "asc" };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }

        if let Some(limit) = query.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }

    async fn send(&self, request: RequestBuilder, table: Table) -> AppResult<Vec<Value>> {
        let response = self.authorized(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                table = %table,
                status = %status,
                body = %body,
                "Profile store request failed"
            );
            return Err(if status == reqwest::StatusCode::CONFLICT {
                AppError::Conflict(body)
            } else {
                AppError::ExternalApi(format!(
                    "Profile store returned status {}: {}",
                    status, body
                ))
            });
        }

        let rows: Value = response.json().await?;
        match rows {
            Value::Array(rows) => Ok(rows),
            Value::Null => Ok(Vec::new()),
            row @ Value::Object(_) => Ok(vec![row]),
            _ => Err(AppError::ExternalApi(
                "Invalid profile store response format".to_string(),
            )),
        }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PostgrestStore {
    async fn select(&self, query: Query) -> AppResult<Vec<Value>> {
        let request = self
            .http_client
            .get(self.table_url(query.table))
            .query(&Self::query_params(&query));

        self.send(request, query.table).await
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> AppResult<Vec<Value>> {
        validate_rows(table, &rows)?;
        let request = self
            .http_client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows);

        self.send(request, table).await
    }

    async fn upsert(
        &self,
        table: Table,
        rows: Vec<Value>,
        on_conflict: &'static str,
    ) -> AppResult<Vec<Value>> {
        validate_rows(table, &rows)?;
        let request = self
            .http_client
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&rows);

        self.send(request, table).await
    }

    fn name(&self) -> &'static str {
        "postgrest"
    }
}
