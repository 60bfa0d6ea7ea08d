// Data pipeline: spreadsheet ingestion on the write side, fetch/cache/filter on the read side

pub mod ingestion;
pub mod read;

// Re-export key types and functions from each stage
pub use ingestion::{BatchLoader, IngestProgress, IngestReport, RowNormalizer, RowRejection, Sheet};
pub use read::{
    expand, Dimension, FilterEngine, FilterOptions, PaginatedFetcher, ResultCache, Selections,
};
