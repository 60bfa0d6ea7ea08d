use crate::config::Config;
use crate::error::{Result, TerritorialError};
use crate::storage::{PointStore, SelectQuery};
use crate::types::{StoredPoint, TerritorialPoint};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

/// `PointStore` over Supabase's PostgREST endpoint (`/rest/v1/<table>`).
///
/// Requests carry the project key as `apikey`; the bearer is the signed-in user's token when
/// one was attached, so row-level security sees the real submitter.
#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl SupabaseStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let (url, key) = config.supabase_credentials()?;
        Ok(Self::new(url, key))
    }

    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.as_deref().unwrap_or(&self.api_key))
    }

    /// PostgREST query string for a select: `eq.` filters, ascending order and an
    /// offset/limit pair equivalent to the inclusive range
    pub fn query_params(query: &SelectQuery) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &query.filters {
            params.push((column.clone(), format!("eq.{value}")));
        }
        if let Some(order) = &query.order_by {
            params.push(("order".to_string(), format!("{order}.asc")));
        }
        if let Some((start, end)) = query.range {
            params.push(("offset".to_string(), start.to_string()));
            params.push(("limit".to_string(), (end.saturating_sub(start) + 1).to_string()));
        }
        params
    }
}

#[async_trait]
impl PointStore for SupabaseStore {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<StoredPoint>> {
        let offset = query.range.map_or(0, |(start, _)| start);
        let resp = self
            .client
            .get(self.table_url(&query.table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .query(&Self::query_params(query))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TerritorialError::StorageRead {
                offset,
                message: format!("Supabase select failed: {} - {}", status, body),
            });
        }

        let rows: Vec<StoredPoint> = resp.json().await?;
        debug!("Fetched {} rows from {} at offset {}", rows.len(), query.table, offset);
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &[TerritorialPoint]) -> Result<()> {
        let resp = self
            .client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TerritorialError::StorageWrite {
                batch_index: 0,
                committed_records: 0,
                message: format!("Supabase insert failed: {} - {}", status, body),
            });
        }

        debug!("Inserted {} rows into {}", rows.len(), table);
        Ok(())
    }
}
