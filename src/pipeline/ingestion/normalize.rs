use super::sheet::{CellValue, RawRow, Sheet};
use crate::auth::Submitter;
use crate::constants::{self, REQUIRED_COLUMNS};
use crate::error::{Result, TerritorialError};
use crate::types::{PointDetails, TerritorialPoint};
use std::fmt;

/// Why a row was dropped. Rejections are counted and logged, never raised.
#[derive(Debug, Clone, PartialEq)]
pub enum RowRejection {
    MissingField(&'static str),
    MissingCoordinate(&'static str),
    InvalidCoordinate { column: &'static str, raw: String },
    CoordinateOutOfRange { column: &'static str, value: f64 },
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowRejection::MissingField(column) => write!(f, "missing value for {column}"),
            RowRejection::MissingCoordinate(column) => write!(f, "missing coordinate {column}"),
            RowRejection::InvalidCoordinate { column, raw } => {
                write!(f, "unparseable coordinate {column}: {raw:?}")
            }
            RowRejection::CoordinateOutOfRange { column, value } => {
                write!(f, "coordinate {column} out of range: {value}")
            }
        }
    }
}

/// Fails with the missing and found columns unless every required header is present
pub fn check_schema(sheet: &Sheet) -> Result<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !sheet.has_column(col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(TerritorialError::Schema {
            missing,
            found: sheet.headers().to_vec(),
        })
    }
}

/// Decimal-comma tolerant: the cell is rendered as text, `,` becomes `.`, then parsed
pub fn parse_coordinate(cell: &CellValue) -> Option<f64> {
    cell.to_string()
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Turns SSR workbook rows into points for one submitter.
///
/// Built once per run after the schema check; `normalize` is then a pure function of the row.
#[derive(Debug, Clone)]
pub struct RowNormalizer {
    submitter: Submitter,
    has_beneficiaries: bool,
}

impl RowNormalizer {
    pub fn for_sheet(sheet: &Sheet, submitter: Submitter) -> Result<Self> {
        check_schema(sheet)?;
        Ok(Self {
            submitter,
            has_beneficiaries: sheet.has_column(constants::COL_BENEFICIARIES),
        })
    }

    pub fn normalize(&self, row: &RawRow) -> std::result::Result<TerritorialPoint, RowRejection> {
        let latitude = coordinate(row, constants::COL_LATITUDE, 90.0)?;
        let longitude = coordinate(row, constants::COL_LONGITUDE, 180.0)?;

        let name = required_text(row, constants::COL_NAME)?;
        let region = required_text(row, constants::COL_REGION)?;
        let commune = required_text(row, constants::COL_COMMUNE)?;

        // An absent beneficiaries column defaults to zero; an empty cell stays unknown
        let beneficiarios = if self.has_beneficiaries {
            cell(row, constants::COL_BENEFICIARIES).as_i64()
        } else {
            Some(0)
        };

        let details = PointDetails {
            arranques: cell(row, constants::COL_CONNECTIONS).as_i64(),
            rut: cell(row, constants::COL_RUT).as_text(),
            clasificacion: cell(row, constants::COL_CLASSIFICATION).as_text(),
            beneficiarios,
            extra: Default::default(),
        };

        Ok(TerritorialPoint {
            name,
            point_type: constants::POINT_TYPE_SSR.to_string(),
            region,
            commune,
            latitude,
            longitude,
            details,
            created_by: self.submitter.as_str().to_string(),
        })
    }
}

fn cell<'a>(row: &'a RawRow, column: &str) -> &'a CellValue {
    const EMPTY: &CellValue = &CellValue::Empty;
    row.get(column).unwrap_or(EMPTY)
}

fn required_text(row: &RawRow, column: &'static str) -> std::result::Result<String, RowRejection> {
    cell(row, column)
        .as_text()
        .ok_or(RowRejection::MissingField(column))
}

fn coordinate(
    row: &RawRow,
    column: &'static str,
    limit: f64,
) -> std::result::Result<f64, RowRejection> {
    let raw = cell(row, column);
    if raw.is_empty() {
        return Err(RowRejection::MissingCoordinate(column));
    }
    let value = parse_coordinate(raw).ok_or_else(|| RowRejection::InvalidCoordinate {
        column,
        raw: raw.to_string(),
    })?;
    if value.abs() > limit {
        return Err(RowRejection::CoordinateOutOfRange { column, value });
    }
    Ok(value)
}
