//! First-sheet extraction into row records.
//!
//! The header row supplies the keys of every record:
//! - empty header cells become `__EMPTY`
//! - repeated headers get a numeric suffix (`name`, `name_1`, `name_2`)
//! - blank cells are left out of the record and fully blank rows are skipped

use calamine::{Data, Range, Reader, Sheets, Xls, Xlsx, open_workbook};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::config::{XLS_MIME, XLSX_MIME};
use crate::utils::validation::normalize_mime;

/// One data row keyed by column header, in column order
pub type Row = Map<String, Value>;

const EMPTY_HEADER: &str = "__EMPTY";

/// Largest integer an f64 represents exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("workbook has no sheets")]
    NoSheets,

    #[error("spreadsheet has no data rows")]
    Empty,

    #[error("unrecognized spreadsheet format")]
    UnknownFormat,

    #[error(transparent)]
    Workbook(#[from] calamine::Error),
}

/// Container format of an uploaded workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    /// BIFF inside an OLE compound file
    Xls,
    /// Office Open XML (zip)
    Xlsx,
}

impl SpreadsheetKind {
    /// Detects the format from the leading bytes of the file
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            Some(Self::Xls)
        } else if header.starts_with(b"PK\x03\x04") {
            Some(Self::Xlsx)
        } else {
            None
        }
    }

    pub fn from_mime(content_type: &str) -> Option<Self> {
        match normalize_mime(content_type).as_str() {
            XLS_MIME => Some(Self::Xls),
            XLSX_MIME => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Content wins over the declared type; browsers label files by extension only.
    pub fn detect(header: &[u8], content_type: Option<&str>) -> Option<Self> {
        Self::sniff(header).or_else(|| content_type.and_then(Self::from_mime))
    }
}

/// Opens the workbook at `path` and converts its first sheet into records.
pub fn parse_first_sheet(path: &Path, kind: SpreadsheetKind) -> Result<Vec<Row>, SheetError> {
    let mut workbook = match kind {
        SpreadsheetKind::Xls => {
            Sheets::Xls(open_workbook::<Xls<_>, _>(path).map_err(calamine::Error::Xls)?)
        }
        SpreadsheetKind::Xlsx => {
            Sheets::Xlsx(open_workbook::<Xlsx<_>, _>(path).map_err(calamine::Error::Xlsx)?)
        }
    };

    let range = workbook.worksheet_range_at(0).ok_or(SheetError::NoSheets)??;
    rows_from_range(&range)
}

/// Converts a used range into records, treating its first row as the header.
pub fn rows_from_range(range: &Range<Data>) -> Result<Vec<Row>, SheetError> {
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(first) => header_keys(first),
        None => return Err(SheetError::Empty),
    };

    let records: Vec<Row> = rows
        .filter_map(|cells| {
            let record: Row = headers
                .iter()
                .zip(cells)
                .filter_map(|(key, cell)| cell_value(cell).map(|v| (key.clone(), v)))
                .collect();
            (!record.is_empty()).then_some(record)
        })
        .collect();

    if records.is_empty() {
        return Err(SheetError::Empty);
    }
    Ok(records)
}

fn header_keys(cells: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();

    cells
        .iter()
        .map(|cell| {
            let text = cell.to_string();
            let base = if text.is_empty() {
                EMPTY_HEADER.to_string()
            } else {
                text
            };

            let mut key = base.clone();
            let mut n = 0;
            while seen.contains(&key) {
                n += 1;
                key = format!("{}_{}", base, n);
            }
            seen.insert(key.clone());
            key
        })
        .collect()
}

fn cell_value(cell: &Data) -> Option<Value> {
    match cell {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(Value::String(s.clone())),
        Data::Int(i) => Some(json!(*i)),
        Data::Float(f) => Some(number(*f)),
        Data::Bool(b) => Some(Value::Bool(*b)),
        // Serial day number, as stored in the sheet
        Data::DateTime(dt) => Some(number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(Value::String(s.clone())),
        Data::Error(e) => Some(Value::String(e.to_string())),
    }
}

fn number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
        json!(f as i64)
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
