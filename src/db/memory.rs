use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::{
    db::store::{validate_rows, ProfileStore, Query, Table},
    error::{AppError, AppResult},
};

#[derive(Default)]
struct MemoryTables {
    rows: HashMap<Table, Vec<Map<String, Value>>>,
    next_ids: HashMap<Table, i64>,
}

impl MemoryTables {
    fn next_id(&mut self, table: Table) -> i64 {
        let next = self.next_ids.entry(table).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    /// Fills defaults the way the relational schema would
    fn complete_row(&mut self, table: Table, mut row: Map<String, Value>) -> Map<String, Value> {
        let key = table.primary_key();
        if table != Table::MoviePreferences && row.get(key).map_or(true, Value::is_null) {
            row.insert(key.to_string(), Value::from(self.next_id(table)));
        }
        if table == Table::UserWatchedMovies && row.get("watched_at").map_or(true, Value::is_null)
        {
            row.insert("watched_at".to_string(), Value::from(Utc::now().to_rfc3339()));
        }
        if table == Table::MoviePreferences && row.get("child_account").map_or(true, Value::is_null)
        {
            row.insert("child_account".to_string(), Value::Bool(false));
        }
        for column in table.columns() {
            row.entry(column.to_string()).or_insert(Value::Null);
        }
        row
    }

    fn check_unique(&self, table: Table, row: &Map<String, Value>, skip: Option<usize>) -> AppResult<()> {
        let existing = self.rows.get(&table).map(Vec::as_slice).unwrap_or_default();
        for column in table.unique_columns() {
            let value = row.get(*column).unwrap_or(&Value::Null);
            if value.is_null() {
                continue;
            }
            let clash = existing
                .iter()
                .enumerate()
                .any(|(i, other)| Some(i) != skip && other.get(*column) == Some(value));
            if clash {
                return Err(AppError::Conflict(format!(
                    "duplicate key value violates unique constraint on {}.{}",
                    table, column
                )));
            }
        }
        Ok(())
    }
}

/// In-process profile store
///
/// Mirrors the relational schema closely enough for local development and
/// tests: generated keys, unique columns, equality filters, ordering, limits.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<MemoryTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn into_object(table: Table, row: Value) -> AppResult<Map<String, Value>> {
    match row {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::InvalidInput(format!(
            "{} row must be an object",
            table
        ))),
    }
}

/// Orders JSON scalars; nulls sort last
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[async_trait::async_trait]
impl ProfileStore for MemoryStore {
    async fn select(&self, query: Query) -> AppResult<Vec<Value>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Map<String, Value>> = tables
            .rows
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).collect())
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(
                    a.get(order.column).unwrap_or(&Value::Null),
                    b.get(order.column).unwrap_or(&Value::Null),
                );
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let limit = query.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|row| Value::Object(row.clone()))
            .collect())
    }

    async fn insert(&self, table: Table, rows: Vec<Value>) -> AppResult<Vec<Value>> {
        validate_rows(table, &rows)?;
        let mut tables = self.tables.write().await;
        let mut inserted = Vec::with_capacity(rows.len());

        for row in rows {
            let row = into_object(table, row)?;
            let row = tables.complete_row(table, row);
            tables.check_unique(table, &row, None)?;
            tables.rows.entry(table).or_default().push(row.clone());
            inserted.push(Value::Object(row));
        }

        Ok(inserted)
    }

    async fn upsert(
        &self,
        table: Table,
        rows: Vec<Value>,
        on_conflict: &'static str,
    ) -> AppResult<Vec<Value>> {
        validate_rows(table, &rows)?;
        if !table.has_column(on_conflict) {
            return Err(AppError::InvalidInput(format!(
                "Unknown conflict column {} for {}",
                on_conflict, table
            )));
        }

        let mut tables = self.tables.write().await;
        let mut written = Vec::with_capacity(rows.len());

        for row in rows {
            let row = into_object(table, row)?;
            let key = row.get(on_conflict).cloned().unwrap_or(Value::Null);
            let position = tables.rows.get(&table).and_then(|existing| {
                existing
                    .iter()
                    .position(|other| !key.is_null() && other.get(on_conflict) == Some(&key))
            });

            match position {
                Some(index) => {
                    let mut merged = tables.rows[&table][index].clone();
                    merged.extend(row);
                    tables.check_unique(table, &merged, Some(index))?;
                    if let Some(existing) = tables.rows.get_mut(&table) {
                        existing[index] = merged.clone();
                    }
                    written.push(Value::Object(merged));
                }
                None => {
                    let row = tables.complete_row(table, row);
                    tables.check_unique(table, &row, None)?;
                    tables.rows.entry(table).or_default().push(row.clone());
                    written.push(Value::Object(row));
                }
            }
        }

        Ok(written)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
