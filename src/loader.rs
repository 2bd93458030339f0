use crate::error::{ReportError, Result};
use crate::normalize::normalize_columns;
use crate::types::{Cell, RawTable, COL_BASE};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Reads the fleet spreadsheet and keeps the last table it produced.
///
/// The cached table is reused while the file's path and modification time
/// are unchanged, so repeated menu interactions do not re-read the sheet.
#[derive(Debug, Default)]
pub struct Loader {
    cache: Option<CachedTable>,
}

#[derive(Debug)]
struct CachedTable {
    path: PathBuf,
    modified: SystemTime,
    table: Arc<RawTable>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and normalize the table at `path`.
    ///
    /// A missing file yields an empty table rather than an error: nothing
    /// has been imported yet.
    pub fn load(&mut self, path: &Path) -> Result<Arc<RawTable>> {
        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No input file at {}", path.display());
                self.cache = None;
                return Ok(Arc::new(RawTable::default()));
            }
            Err(source) => {
                return Err(ReportError::FileRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if let Some(cached) = &self.cache {
            if cached.path == path && cached.modified == modified {
                debug!("Reusing cached table for {}", path.display());
                return Ok(Arc::clone(&cached.table));
            }
        }

        let table = Arc::new(read_table(path)?);
        info!(
            "Loaded {} rows x {} columns from {}",
            table.row_count(),
            table.column_count(),
            path.display()
        );
        self.cache = Some(CachedTable {
            path: path.to_path_buf(),
            modified,
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Drop the cached table, e.g. after the files directory was cleaned.
    pub fn invalidate(&mut self) {
        self.cache = None;
    }
}

/// Read a CSV or workbook file into a normalized [`RawTable`].
pub fn read_table(path: &Path) -> Result<RawTable> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let table = match ext.as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xls" | "ods" => read_workbook(path)?,
        _ => return Err(ReportError::UnsupportedFormat(path.to_path_buf())),
    };
    Ok(normalize_columns(table))
}

/// Values offered by the base dropdown, in first-seen order.
pub fn base_options(table: &RawTable) -> Vec<String> {
    table.distinct_text(COL_BASE)
}

fn read_csv(path: &Path) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<Cell> = record.iter().map(Cell::from_text).collect();
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        rows.push(row);
    }
    Ok(RawTable::new(headers, rows))
}

fn read_workbook(path: &Path) -> Result<RawTable> {
    let workbook_err = |source| ReportError::Workbook {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = open_workbook_auto(path).map_err(workbook_err)?;
    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(workbook_err)?,
        None => return Ok(RawTable::default()),
    };

    let mut sheet_rows = range.rows();
    let Some(header_row) = sheet_rows.next() else {
        return Ok(RawTable::default());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|d| cell_from_data(d).as_text().unwrap_or_default())
        .collect();

    let rows: Vec<Vec<Cell>> = sheet_rows
        .map(|r| r.iter().map(cell_from_data).collect::<Vec<Cell>>())
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect();
    Ok(RawTable::new(headers, rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Empty),
    }
}
