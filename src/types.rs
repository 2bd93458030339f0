use chrono::NaiveDateTime;
use serde::Serialize;
use tabled::Tabled;

use crate::error::{ReportError, Result};
use crate::util::{excel_serial_to_datetime, format_number, parse_datetime_safe, parse_f64_safe};

// Identity columns keep their source names.
pub const COL_VEHICLE: &str = "Veículo/Equip.";
pub const COL_BASE: &str = "Base";
pub const COL_TYPE: &str = "Tipo";
pub const COL_MODEL: &str = "Modelo";
pub const COL_PLATE: &str = "PLACA/";
pub const COL_DATE: &str = "Data";
pub const COL_ODOMETER: &str = "KmAtual";
pub const COL_HOURS: &str = "Horas";

// Canonical names produced by the column normalizer.
pub const COL_TOTAL_COST: &str = "Total Gasto";
pub const COL_TOTAL_LITERS: &str = "Total Litros";
pub const COL_TOTAL_KM: &str = "Total Km";
pub const COL_TOTAL_HOURS: &str = "Total Hr";
pub const COL_AVG_KM_PER_LITER: &str = "Media Km/Lt";
pub const COL_AVG_HOURS_PER_LITER: &str = "Media Hr/Lt";

/// A single spreadsheet cell as read from CSV or a workbook.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Build a cell from raw text, mapping blank strings to [`Cell::Empty`].
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text rendering used for identity fields.
    ///
    /// Whole numbers drop their fractional part so a vehicle id stored as
    /// `101.0` reads as `101`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            Cell::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => parse_f64_safe(Some(s)),
            _ => None,
        }
    }

    /// Date-time value of the cell. Plain numbers are read as workbook
    /// serial days.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(dt) => Some(*dt),
            Cell::Text(s) => parse_datetime_safe(Some(s)),
            Cell::Number(n) => excel_serial_to_datetime(*n),
            Cell::Empty => None,
        }
    }
}

/// A sheet of cells with a header row. An absent input file is represented
/// by the default value: zero columns and zero rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self { headers, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| ReportError::MissingColumn(name.to_string()))
    }

    /// Cell at `idx` of `row`; short rows read as empty.
    pub fn cell<'a>(&self, row: &'a [Cell], idx: usize) -> &'a Cell {
        row.get(idx).unwrap_or(&EMPTY_CELL)
    }

    /// Distinct non-empty text values of a column in first-seen order.
    pub fn distinct_text(&self, name: &str) -> Vec<String> {
        let Some(idx) = self.column_index(name) else {
            return Vec::new();
        };
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            if let Some(v) = self.cell(row, idx).as_text() {
                if !seen.contains(&v) {
                    seen.push(v);
                }
            }
        }
        seen
    }
}

/// One vehicle's summary for the selected month.
///
/// Field order is the column order of the on-screen table and the export.
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct MonthlyRow {
    #[serde(rename = "Veículo/Equip.")]
    #[tabled(rename = "Veículo/Equip.", display_with = "display_text")]
    pub vehicle: Option<String>,
    #[serde(rename = "Base")]
    #[tabled(rename = "Base", display_with = "display_text")]
    pub base: Option<String>,
    #[serde(rename = "Tipo")]
    #[tabled(rename = "Tipo", display_with = "display_text")]
    pub kind: Option<String>,
    #[serde(rename = "Modelo")]
    #[tabled(rename = "Modelo", display_with = "display_text")]
    pub model: Option<String>,
    #[serde(rename = "PLACA/")]
    #[tabled(rename = "PLACA/", display_with = "display_text")]
    pub plate: Option<String>,
    #[serde(rename = "Total Gasto")]
    #[tabled(rename = "Total Gasto", display_with = "display_amount")]
    pub total_cost: f64,
    #[serde(rename = "Total Litros")]
    #[tabled(rename = "Total Litros", display_with = "display_amount")]
    pub total_liters: f64,
    #[serde(rename = "Total Km")]
    #[tabled(rename = "Total Km", display_with = "display_amount")]
    pub total_km: f64,
    #[serde(rename = "Total Hr")]
    #[tabled(rename = "Total Hr", display_with = "display_amount")]
    pub total_hours: f64,
    #[serde(rename = "Media Km/Lt")]
    #[tabled(rename = "Media Km/Lt", display_with = "display_opt_amount")]
    pub avg_km_per_liter: Option<f64>,
    #[serde(rename = "Media Hr/Lt")]
    #[tabled(rename = "Media Hr/Lt", display_with = "display_opt_amount")]
    pub avg_hours_per_liter: Option<f64>,
    #[serde(rename = "KmAtual")]
    #[tabled(rename = "KmAtual", display_with = "display_opt_amount")]
    pub odometer: Option<f64>,
    #[serde(rename = "Horas")]
    #[tabled(rename = "Horas", display_with = "display_opt_amount")]
    pub hours: Option<f64>,
}

/// Column headers of a [`MonthlyRow`] in field order.
pub const MONTHLY_COLUMNS: [&str; 13] = [
    COL_VEHICLE,
    COL_BASE,
    COL_TYPE,
    COL_MODEL,
    COL_PLATE,
    COL_TOTAL_COST,
    COL_TOTAL_LITERS,
    COL_TOTAL_KM,
    COL_TOTAL_HOURS,
    COL_AVG_KM_PER_LITER,
    COL_AVG_HOURS_PER_LITER,
    COL_ODOMETER,
    COL_HOURS,
];

impl MonthlyRow {
    pub fn key_fields(&self) -> [Option<&str>; 5] {
        [
            self.vehicle.as_deref(),
            self.base.as_deref(),
            self.kind.as_deref(),
            self.model.as_deref(),
            self.plate.as_deref(),
        ]
    }

    pub fn numeric_fields(&self) -> [Option<f64>; 8] {
        [
            Some(self.total_cost),
            Some(self.total_liters),
            Some(self.total_km),
            Some(self.total_hours),
            self.avg_km_per_liter,
            self.avg_hours_per_liter,
            self.odometer,
            self.hours,
        ]
    }
}

fn display_text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

fn display_amount(v: &f64) -> String {
    format_number(*v, 2)
}

fn display_opt_amount(v: &Option<f64>) -> String {
    v.map(|n| format_number(n, 2)).unwrap_or_default()
}
