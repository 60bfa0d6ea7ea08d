use super::normalize::RowNormalizer;
use super::sheet::Sheet;
use crate::auth::Submitter;
use crate::config::Config;
use crate::constants;
use crate::error::{Result, TerritorialError};
use crate::pipeline::read::cache::Invalidate;
use crate::storage::PointStore;
use crate::types::TerritorialPoint;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Coarse progress of a run, reported every `progress_every` rows and once at the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestProgress {
    pub rows_scanned: usize,
    pub total_rows: usize,
}

impl IngestProgress {
    pub fn fraction(&self) -> f64 {
        if self.total_rows == 0 {
            1.0
        } else {
            self.rows_scanned as f64 / self.total_rows as f64
        }
    }
}

/// Outcome of a successful run. `accepted` is the number of records written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub rows_scanned: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub batches_written: usize,
}

/// Loads a whole workbook into the points table.
///
/// Batches are written one after another with no transaction around them: if batch `k`
/// fails, batches `0..k` stay persisted and the error reports how many records that is.
/// Loading the same file twice stores every record twice.
pub struct BatchLoader {
    store: Arc<dyn PointStore>,
    table: String,
    batch_size: usize,
    progress_every: usize,
    cache: Option<Arc<dyn Invalidate>>,
}

impl BatchLoader {
    pub fn new(store: Arc<dyn PointStore>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
            batch_size: constants::DEFAULT_BATCH_SIZE,
            progress_every: constants::DEFAULT_PROGRESS_EVERY,
            cache: None,
        }
    }

    pub fn from_config(store: Arc<dyn PointStore>, config: &Config) -> Self {
        Self::new(store, config.store.table.clone())
            .with_batch_size(config.ingest.batch_size)
            .with_progress_every(config.ingest.progress_every)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress_every(mut self, progress_every: usize) -> Self {
        self.progress_every = progress_every.max(1);
        self
    }

    /// Cache to invalidate once a run has been fully written
    pub fn with_cache(mut self, cache: Arc<dyn Invalidate>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Decode workbook bytes and load them. A file that cannot be decoded writes nothing.
    pub async fn load(
        &self,
        bytes: &[u8],
        submitter: &Submitter,
        progress: &mut (dyn FnMut(IngestProgress) + Send),
    ) -> Result<IngestReport> {
        let sheet = Sheet::decode(bytes)?;
        self.load_sheet(&sheet, submitter, progress).await
    }

    #[instrument(skip_all, fields(table = %self.table, rows = sheet.len(), submitter = %submitter))]
    pub async fn load_sheet(
        &self,
        sheet: &Sheet,
        submitter: &Submitter,
        progress: &mut (dyn FnMut(IngestProgress) + Send),
    ) -> Result<IngestReport> {
        let run_id = Uuid::new_v4();
        let normalizer = match RowNormalizer::for_sheet(sheet, submitter.clone()) {
            Ok(normalizer) => normalizer,
            Err(e) => {
                error!("Ingestion run {} aborted before reading rows: {}", run_id, e);
                return Err(e);
            }
        };

        info!("🚀 Starting ingestion run {} ({} rows)", run_id, sheet.len());
        metrics::counter!("territorial_ingest_runs_total").increment(1);
        let t_run = std::time::Instant::now();

        let total_rows = sheet.len();
        let mut accepted: Vec<TerritorialPoint> = Vec::new();
        let mut rejected = 0usize;

        for (idx, row) in sheet.rows().iter().enumerate() {
            match normalizer.normalize(row) {
                Ok(point) => accepted.push(point),
                Err(reason) => {
                    rejected += 1;
                    // spreadsheet row number: header is row 1
                    debug!("Skipping row {}: {}", idx + 2, reason);
                }
            }
            let scanned = idx + 1;
            if scanned % self.progress_every == 0 {
                progress(IngestProgress {
                    rows_scanned: scanned,
                    total_rows,
                });
            }
        }

        metrics::counter!("territorial_rows_accepted_total").increment(accepted.len() as u64);
        metrics::counter!("territorial_rows_rejected_total").increment(rejected as u64);
        info!(
            "🔧 Normalized {} rows ({} accepted, {} rejected)",
            total_rows,
            accepted.len(),
            rejected
        );

        let batches_written = self.write_batches(&accepted).await?;

        progress(IngestProgress {
            rows_scanned: total_rows,
            total_rows,
        });
        if let Some(cache) = &self.cache {
            cache.invalidate();
        }

        metrics::histogram!("territorial_ingest_duration_seconds")
            .record(t_run.elapsed().as_secs_f64());
        info!(
            "✅ Ingestion run {} wrote {} records in {} batches",
            run_id,
            accepted.len(),
            batches_written
        );

        Ok(IngestReport {
            run_id,
            rows_scanned: total_rows,
            accepted: accepted.len(),
            rejected,
            batches_written,
        })
    }

    /// Sequential inserts; stops at the first failing batch
    async fn write_batches(&self, records: &[TerritorialPoint]) -> Result<usize> {
        let mut committed_records = 0;
        let mut batches_written = 0;

        for (batch_index, batch) in records.chunks(self.batch_size).enumerate() {
            if let Err(e) = self.store.insert(&self.table, batch).await {
                error!(
                    "Batch {} failed after {} committed records: {}",
                    batch_index, committed_records, e
                );
                metrics::counter!("territorial_batch_failures_total").increment(1);
                return Err(TerritorialError::StorageWrite {
                    batch_index,
                    committed_records,
                    message: e.detail(),
                });
            }
            committed_records += batch.len();
            batches_written += 1;
            metrics::counter!("territorial_batches_written_total").increment(1);
            debug!("💾 Batch {} written ({} records)", batch_index, batch.len());
        }

        Ok(batches_written)
    }
}
