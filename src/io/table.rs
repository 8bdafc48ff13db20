//! Raw tabular reading.
//!
//! Uploads arrive as bytes plus a file name. We turn them into a `RawTable`
//! (normalized headers + string cells) without interpreting any column; typed
//! validation happens in `ingest`.
//!
//! Supported encodings:
//! - comma-delimited text (`.csv`, `.txt`)
//! - spreadsheets (`.xlsx`, `.xlsm`, `.xls`): first worksheet, first row is the header

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Xls, Xlsx};

use crate::error::PlanError;

/// An uploaded file: name (used for format detection) and raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, PlanError> {
        let bytes = std::fs::read(path).map_err(|e| PlanError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self {
            name: path.display().to_string(),
            bytes,
        })
    }

    pub fn format(&self) -> Option<FileFormat> {
        let ext = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)?;
        match ext.as_str() {
            "csv" | "txt" => Some(FileFormat::Csv),
            "xlsx" | "xlsm" => Some(FileFormat::Xlsx),
            "xls" => Some(FileFormat::Xls),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
    Xls,
}

/// A data row with its 1-based line number in the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub cells: Vec<String>,
}

/// Header + rows, all as trimmed strings.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    /// Table kind shown in error messages ("Cost Data", ...).
    pub table: String,
    /// Normalized header names (see `normalize_header_name`).
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// Rows that could not be decoded at all.
    pub unreadable: Vec<(usize, String)>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Decode an upload into a raw table.
pub fn read_table(table: &str, upload: &Upload) -> Result<RawTable, PlanError> {
    match upload.format() {
        Some(FileFormat::Csv) => read_csv(table, &upload.bytes),
        Some(FileFormat::Xlsx) => {
            let workbook: Xlsx<_> = Xlsx::new(Cursor::new(upload.bytes.clone()))
                .map_err(|e| PlanError::validation(table, format!("Unreadable spreadsheet '{}': {e:?}", upload.name)))?;
            read_sheet(table, workbook, &upload.name)
        }
        Some(FileFormat::Xls) => {
            let workbook: Xls<_> = Xls::new(Cursor::new(upload.bytes.clone()))
                .map_err(|e| PlanError::validation(table, format!("Unreadable spreadsheet '{}': {e:?}", upload.name)))?;
            read_sheet(table, workbook, &upload.name)
        }
        None => Err(PlanError::validation(
            table,
            format!("Unsupported file type '{}'. Expected .csv or .xlsx.", upload.name),
        )),
    }
}

fn read_csv(table: &str, bytes: &[u8]) -> Result<RawTable, PlanError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PlanError::validation(table, format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut rows = Vec::new();
    let mut unreadable = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header, lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(record) => {
                let cells: Vec<String> = record.iter().map(str::to_string).collect();
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                rows.push(RawRow { line, cells });
            }
            Err(e) => unreadable.push((line, format!("CSV parse error: {e}"))),
        }
    }

    Ok(RawTable {
        table: table.to_string(),
        headers,
        rows,
        unreadable,
    })
}

fn read_sheet<R>(table: &str, mut workbook: R, name: &str) -> Result<RawTable, PlanError>
where
    R: Reader<Cursor<Vec<u8>>>,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PlanError::validation(table, format!("Spreadsheet '{name}' has no worksheets.")))?
        .map_err(|e| PlanError::validation(table, format!("Unreadable worksheet in '{name}': {e:?}")))?;

    let mut sheet_rows = range.rows();
    let headers: Vec<String> = sheet_rows
        .next()
        .map(|cells| cells.iter().map(|c| normalize_header_name(&cell_text(c))).collect())
        .unwrap_or_default();

    let rows = sheet_rows
        .enumerate()
        .map(|(idx, cells)| RawRow {
            line: idx + 2,
            cells: cells.iter().map(cell_text).collect(),
        })
        .filter(|r| r.cells.iter().any(|c| !c.is_empty()))
        .collect();

    Ok(RawTable {
        table: table.to_string(),
        headers,
        rows,
        unreadable: Vec::new(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        // Unit numbers typed into a sheet come back as floats (`101.0`).
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string().trim().to_string(),
    }
}

/// Lowercase, trim, strip a UTF-8 BOM and use `_` for inner whitespace.
///
/// Excel exports often carry a BOM on the first header, and people write
/// `Unit Number` as often as `unit_number`.
pub fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}').trim();
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_ascii_lowercase()
}
