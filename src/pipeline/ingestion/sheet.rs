use crate::error::{Result, TerritorialError};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;

/// One spreadsheet cell, independent of the workbook format
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed text, `None` for empty cells
    pub fn as_text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string().trim().to_string())
        }
    }

    /// Whole numbers only; numeric text with a decimal comma is accepted
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(v) => Some(*v),
            CellValue::Float(f) => crate::types::float_as_i64(*f),
            CellValue::Text(s) => {
                let trimmed = s.trim();
                trimmed.parse::<i64>().ok().or_else(|| {
                    trimmed
                        .replace(',', ".")
                        .parse::<f64>()
                        .ok()
                        .and_then(crate::types::float_as_i64)
                })
            }
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Int(v) => write!(f, "{v}"),
            CellValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(v) => CellValue::Float(*v),
            Data::Int(v) => CellValue::Int(*v),
            Data::Bool(v) => CellValue::Bool(*v),
            Data::DateTime(dt) => CellValue::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Column name -> cell, for one data row
pub type RawRow = HashMap<String, CellValue>;

/// First worksheet of an uploaded workbook: header row plus data rows keyed by header
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<RawRow>,
}

impl Sheet {
    /// Build from positional rows. Short rows are padded with empty cells; when a header
    /// repeats, the first column with that name wins.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        let rows = rows
            .into_iter()
            .map(|cells| {
                let mut row = RawRow::with_capacity(headers.len());
                for (idx, header) in headers.iter().enumerate() {
                    if header.is_empty() {
                        continue;
                    }
                    let cell = cells.get(idx).cloned().unwrap_or(CellValue::Empty);
                    row.entry(header.clone()).or_insert(cell);
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    /// Decode xlsx/xlsm/xls/ods bytes. Any decode failure fails the whole file.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| TerritorialError::Spreadsheet(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| TerritorialError::Spreadsheet("workbook has no worksheets".to_string()))?
            .map_err(|e| TerritorialError::Spreadsheet(e.to_string()))?;

        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|cells| {
                cells
                    .iter()
                    .map(|c| CellValue::from(c).to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let body = rows
            .map(|cells| cells.iter().map(CellValue::from).collect())
            .collect();

        Ok(Self::new(headers, body))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}
