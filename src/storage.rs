use crate::error::{Result, TerritorialError};
use crate::types::{StoredPoint, TerritorialPoint};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A read against one table: equality filters, an optional order column and an
/// inclusive row range, mirroring the PostgREST query builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    pub table: String,
    pub filters: Vec<(String, String)>,
    pub order_by: Option<String>,
    /// Inclusive `(start, end)` row window
    pub range: Option<(usize, usize)>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: None,
            range: None,
        }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    pub fn range(mut self, start: usize, end: usize) -> Self {
        self.range = Some((start, end));
        self
    }
}

/// Append-only access to the remote points table.
///
/// `insert` has no idempotency guarantee: re-sending a batch stores it twice.
#[async_trait]
pub trait PointStore: Send + Sync {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<StoredPoint>>;
    async fn insert(&self, table: &str, rows: &[TerritorialPoint]) -> Result<()>;
}

/// In-memory storage implementation for development/testing
pub struct InMemoryStorage {
    tables: Arc<Mutex<HashMap<String, Vec<StoredPoint>>>>,
    next_id: Arc<Mutex<i64>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Number of rows currently held in `table`
    pub fn len(&self, table: &str) -> usize {
        self.tables
            .lock()
            .map(|tables| tables.get(table).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }
}

fn poisoned(what: &str) -> TerritorialError {
    TerritorialError::StorageRead {
        offset: 0,
        message: format!("in-memory {what} lock poisoned"),
    }
}

fn column_value(stored: &StoredPoint, column: &str) -> Option<String> {
    let point = &stored.point;
    match column {
        "id" => stored.id.map(|id| id.to_string()),
        "nombre_oficial" => Some(point.name.clone()),
        "tipo_punto" => Some(point.point_type.clone()),
        "region" => Some(point.region.clone()),
        "comuna" => Some(point.commune.clone()),
        "usuario_creador" => Some(point.created_by.clone()),
        _ => None,
    }
}

#[async_trait]
impl PointStore for InMemoryStorage {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<StoredPoint>> {
        let tables = self.tables.lock().map_err(|_| poisoned("tables"))?;
        let mut rows: Vec<StoredPoint> = tables
            .get(&query.table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| {
                        query
                            .filters
                            .iter()
                            .all(|(col, val)| column_value(row, col).as_deref() == Some(val.as_str()))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Rows are stored in id order already; other order columns sort stably
        if let Some(order) = query.order_by.as_deref().filter(|c| *c != "id") {
            rows.sort_by(|a, b| column_value(a, order).cmp(&column_value(b, order)));
        }

        if let Some((start, end)) = query.range {
            rows = rows
                .into_iter()
                .skip(start)
                .take(end.saturating_sub(start) + 1)
                .collect();
        }

        debug!("Selected {} rows from {}", rows.len(), query.table);
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &[TerritorialPoint]) -> Result<()> {
        let mut tables = self.tables.lock().map_err(|_| poisoned("tables"))?;
        let mut next_id = self.next_id.lock().map_err(|_| poisoned("id"))?;
        let target = tables.entry(table.to_string()).or_default();
        for point in rows {
            let mut stored = StoredPoint::new(Some(*next_id), point.clone());
            stored.created_at = Some(Utc::now());
            *next_id += 1;
            target.push(stored);
        }

        debug!("Inserted {} rows into {}", rows.len(), table);
        Ok(())
    }
}
