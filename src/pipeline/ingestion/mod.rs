// Pipeline ingestion: workbook decoding, row normalization, and batched writes

pub mod loader;
pub mod normalize;
pub mod sheet;

// Re-export key types and functions for external use
pub use loader::{BatchLoader, IngestProgress, IngestReport};
pub use normalize::{check_schema, parse_coordinate, RowNormalizer, RowRejection};
pub use sheet::{CellValue, RawRow, Sheet};
