use crate::constants::CLASSIFICATION_UNKNOWN;
use crate::types::{PointRow, StoredPoint};

/// Project `detalles` sub-fields into flat columns. `details` itself is kept for display.
pub fn expand(table: Vec<StoredPoint>) -> Vec<PointRow> {
    table.into_iter().map(expand_row).collect()
}

pub fn expand_row(stored: StoredPoint) -> PointRow {
    let details = &stored.point.details;
    let arranques = details.arranques.unwrap_or(0);
    let clasificacion = details
        .clasificacion
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| CLASSIFICATION_UNKNOWN.to_string());
    let beneficiarios = details.beneficiarios.unwrap_or(0);
    let rut = details.rut.clone().unwrap_or_default();

    PointRow {
        stored,
        arranques,
        clasificacion,
        beneficiarios,
        rut,
    }
}
