use crate::error::{ReportError, Result};
use crate::loader::read_table;
use crate::types::{MonthlyRow, MONTHLY_COLUMNS};
use crate::util::format_number;
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const EXPORT_SHEET_NAME: &str = "Dados Mensais";
pub const CHART_TITLE: &str = "Distância Percorrida por Veículo";
const CHART_WIDTH: usize = 40;

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Horizontal bar chart of Total Km per vehicle.
pub fn render_km_chart(rows: &[MonthlyRow]) -> String {
    let mut out = format!("{}\n", CHART_TITLE);
    if rows.is_empty() {
        out.push_str("(no rows)\n");
        return out;
    }
    let labels: Vec<String> = rows
        .iter()
        .map(|r| r.vehicle.clone().unwrap_or_else(|| "-".to_string()))
        .collect();
    let label_width = labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let max_km = rows.iter().map(|r| r.total_km).fold(0.0_f64, f64::max);

    for (label, row) in labels.iter().zip(rows) {
        let len = if max_km > 0.0 && row.total_km > 0.0 {
            ((row.total_km / max_km) * CHART_WIDTH as f64).round().max(1.0) as usize
        } else {
            0
        };
        let pad = label_width - label.chars().count();
        out.push_str(&format!(
            "{}{} | {} {}\n",
            label,
            " ".repeat(pad),
            "#".repeat(len),
            format_number(row.total_km, 2)
        ));
    }
    out
}

/// Write the monthly table to `path`, replacing any earlier export.
///
/// A `.csv` path gets CSV; anything else gets a workbook with a single
/// `Dados Mensais` sheet.
pub fn export_report(path: &Path, rows: &[MonthlyRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        write_csv(path, rows)?;
    } else {
        write_xlsx(path, rows)?;
    }
    info!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| ReportError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

pub fn write_xlsx(path: &Path, rows: &[MonthlyRow]) -> Result<()> {
    let export_err = |source| ReportError::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(EXPORT_SHEET_NAME).map_err(export_err)?;

    for (col, name) in MONTHLY_COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *name, &header_format)
            .map_err(export_err)?;
    }
    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, text) in row.key_fields().iter().enumerate() {
            if let Some(text) = text {
                sheet
                    .write_string(r, col as u16, *text)
                    .map_err(export_err)?;
            }
        }
        let offset = row.key_fields().len();
        for (col, value) in row.numeric_fields().iter().enumerate() {
            if let Some(value) = value {
                sheet
                    .write_number(r, (offset + col) as u16, *value)
                    .map_err(export_err)?;
            }
        }
    }
    workbook.save(path).map_err(export_err)?;
    Ok(())
}

/// Read an exported monthly table back into rows.
pub fn read_export(path: &Path) -> Result<Vec<MonthlyRow>> {
    let table = read_table(path)?;
    if table.is_empty() {
        return Ok(Vec::new());
    }
    let idx: Vec<usize> = MONTHLY_COLUMNS
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<_>>()?;

    Ok(table
        .rows
        .iter()
        .map(|row| {
            let cell = |i: usize| table.cell(row, idx[i]);
            MonthlyRow {
                vehicle: cell(0).as_text(),
                base: cell(1).as_text(),
                kind: cell(2).as_text(),
                model: cell(3).as_text(),
                plate: cell(4).as_text(),
                total_cost: cell(5).as_f64().unwrap_or(0.0),
                total_liters: cell(6).as_f64().unwrap_or(0.0),
                total_km: cell(7).as_f64().unwrap_or(0.0),
                total_hours: cell(8).as_f64().unwrap_or(0.0),
                avg_km_per_liter: cell(9).as_f64(),
                avg_hours_per_liter: cell(10).as_f64(),
                odometer: cell(11).as_f64(),
                hours: cell(12).as_f64(),
            }
        })
        .collect())
}
