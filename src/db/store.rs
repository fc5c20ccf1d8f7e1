/// Profile store abstraction
///
/// The profile store is a hosted relational backend exposing table-like
/// collections through point queries. Backends implement three primitives
/// (select, insert, upsert) over JSON rows; typed access lives in
/// `services::profile`.
use std::fmt::Display;

use serde_json::{Map, Value};

use crate::error::AppResult;

/// Collections the service reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    UserInfo,
    MoviePreferences,
    Movies,
    UserWatchedMovies,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::UserInfo => "user_info",
            Table::MoviePreferences => "movie_preferences",
            Table::Movies => "movies",
            Table::UserWatchedMovies => "user_watched_movies",
        }
    }

    /// Column generated by the store on insert
    pub fn primary_key(&self) -> &'static str {
        match self {
            Table::UserInfo | Table::UserWatchedMovies => "id",
            Table::Movies => "movie_id",
            Table::MoviePreferences => "user_id",
        }
    }

    /// Columns a row may carry; anything else is rejected before reaching the store
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::UserInfo => &["id", "user_name", "first_name", "last_name", "email"],
            Table::MoviePreferences => &[
                "user_id",
                "child_account",
                "movies_watched_id",
                "preferences",
            ],
            Table::Movies => &["movie_id", "title", "released", "description", "imdb_id"],
            Table::UserWatchedMovies => &["id", "user_id", "movie_id", "watched_at"],
        }
    }

    /// Columns whose values must be unique across rows
    pub fn unique_columns(&self) -> &'static [&'static str] {
        match self {
            Table::UserInfo => &["email"],
            Table::MoviePreferences => &["user_id"],
            Table::Movies | Table::UserWatchedMovies => &[],
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns().contains(&column)
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sort order for a select
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// A point query: equality filters, optional ordering, optional limit
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<(&'static str, Value)>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    pub fn order_desc(mut self, column: &'static str) -> Self {
        self.order = Some(Order {
            column,
            descending: true,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// True when `row` satisfies every equality filter
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.filters
            .iter()
            .all(|(column, value)| row.get(*column).unwrap_or(&Value::Null) == value)
    }
}

/// Trait for profile store backends
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Rows matching the query
    async fn select(&self, query: Query) -> AppResult<Vec<Value>>;

    /// Inserts rows and returns them as stored (with generated keys)
    async fn insert(&self, table: Table, rows: Vec<Value>) -> AppResult<Vec<Value>>;

    /// Inserts rows, replacing any existing row that collides on `on_conflict`
    async fn upsert(
        &self,
        table: Table,
        rows: Vec<Value>,
        on_conflict: &'static str,
    ) -> AppResult<Vec<Value>>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Rejects rows that are not objects or carry columns outside the table's schema
pub fn validate_rows(table: Table, rows: &[Value]) -> AppResult<()> {
    for row in rows {
        let object = row.as_object().ok_or_else(|| {
            crate::error::AppError::InvalidInput(format!("{} row must be an object", table))
        })?;
        if let Some(column) = object.keys().find(|c| !table.has_column(c)) {
            return Err(crate::error::AppError::InvalidInput(format!(
                "Unknown column {} for {}",
                column, table
            )));
        }
    }
    Ok(())
}
