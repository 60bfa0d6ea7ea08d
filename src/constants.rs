/// Column, table and tag constants shared by ingestion and the read side.
/// Spreadsheet headers are the ones used by the official SSR workbook.

// Storage table
pub const POINTS_TABLE: &str = "puntos_territoriales";

// Fixed tag stamped on every point loaded from the SSR workbook
pub const POINT_TYPE_SSR: &str = "SSR";

// Spreadsheet columns
pub const COL_NAME: &str = "NOMBRE_OFICIAL_SISTEMA";
pub const COL_REGION: &str = "REGIÓN";
pub const COL_COMMUNE: &str = "COMUNA";
pub const COL_LATITUDE: &str = "COORD_GEOGRÁFICAS_LATITUD_SIRGAS_CHILE";
pub const COL_LONGITUDE: &str = "COORD_GEOGRÁFICAS_LONGITUD_SIRGAS_CHILE";
pub const COL_CONNECTIONS: &str = "N°_ARRANQUES";
pub const COL_RUT: &str = "RUT";
pub const COL_CLASSIFICATION: &str = "CLASIFICACIÓN_ART_106_D50";
pub const COL_BENEFICIARIES: &str = "BENEFICIARIOS_ESTIMADOS";

/// Columns that must all be present before any row is read
pub const REQUIRED_COLUMNS: [&str; 8] = [
    COL_NAME,
    COL_REGION,
    COL_COMMUNE,
    COL_LATITUDE,
    COL_LONGITUDE,
    COL_CONNECTIONS,
    COL_RUT,
    COL_CLASSIFICATION,
];

// Expanded-field defaults
pub const CLASSIFICATION_UNKNOWN: &str = "S/I";

// Filter wildcards accepted from callers (compared case-insensitively)
pub const WILDCARD_ALL: &str = "all";
pub const WILDCARD_TODAS: &str = "Todas";

// Batch/page defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_PROGRESS_EVERY: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

// Map presentation
pub const ZOOM_COUNTRY: u8 = 6;
pub const ZOOM_REGION: u8 = 10;
pub const MARKER_SSR: &str = "blue";
pub const MARKER_OTHER: &str = "green";

/// Returns true when a filter value means "no restriction"
pub fn is_wildcard(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(WILDCARD_ALL) || v.eq_ignore_ascii_case(WILDCARD_TODAS)
}
