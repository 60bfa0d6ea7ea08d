use crate::config::Config;
use crate::constants;
use crate::error::{Result, TerritorialError};
use crate::storage::{PointStore, SelectQuery};
use crate::types::StoredPoint;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reads a whole table in fixed windows of `page_size` rows.
///
/// Pages are requested from offset 0 upwards until one comes back short (or empty); rows are
/// concatenated in the order the store returns them. Any failed page fails the whole fetch.
pub struct PaginatedFetcher {
    store: Arc<dyn PointStore>,
    table: String,
    page_size: usize,
    order_by: Option<String>,
    filters: Vec<(String, String)>,
}

impl PaginatedFetcher {
    pub fn new(store: Arc<dyn PointStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            page_size: constants::DEFAULT_PAGE_SIZE,
            order_by: None,
            filters: Vec::new(),
        }
    }

    pub fn from_config(store: Arc<dyn PointStore>, config: &Config) -> Self {
        let fetcher = Self::new(store, config.store.table.clone()).with_page_size(config.read.page_size);
        match &config.store.order_column {
            Some(column) => fetcher.with_order(column.clone()),
            None => fetcher,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_order(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    /// Equality filter pushed down to the store on every page
    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn page_query(&self, offset: usize) -> SelectQuery {
        let mut query = SelectQuery::new(self.table.clone()).range(offset, offset + self.page_size - 1);
        for (column, value) in &self.filters {
            query = query.eq(column.clone(), value.clone());
        }
        if let Some(order) = &self.order_by {
            query = query.order(order.clone());
        }
        query
    }

    #[instrument(skip(self), fields(table = %self.table, page_size = self.page_size))]
    pub async fn fetch_all(&self) -> Result<Vec<StoredPoint>> {
        let t_fetch = std::time::Instant::now();
        let mut rows = Vec::new();
        let mut offset = 0;
        let mut pages = 0;

        loop {
            let page = self
                .store
                .select(&self.page_query(offset))
                .await
                .map_err(|e| TerritorialError::StorageRead {
                    offset,
                    message: e.detail(),
                })?;
            pages += 1;
            let fetched = page.len();
            debug!("📡 Page at offset {} returned {} rows", offset, fetched);
            rows.extend(page);

            if fetched < self.page_size {
                break;
            }
            offset += self.page_size;
        }

        metrics::counter!("territorial_fetch_pages_total").increment(pages as u64);
        metrics::histogram!("territorial_fetch_duration_seconds")
            .record(t_fetch.elapsed().as_secs_f64());
        info!("✅ Fetched {} rows from {} in {} pages", rows.len(), self.table, pages);
        Ok(rows)
    }
}
