use crate::error::{ReportError, Result};
use crate::filter::{apply_filters, FilterCriteria};
use crate::types::{
    MonthlyRow, RawTable, COL_AVG_HOURS_PER_LITER, COL_AVG_KM_PER_LITER, COL_BASE, COL_DATE,
    COL_HOURS, COL_MODEL, COL_ODOMETER, COL_PLATE, COL_TOTAL_COST, COL_TOTAL_HOURS, COL_TOTAL_KM,
    COL_TOTAL_LITERS, COL_TYPE, COL_VEHICLE,
};
use crate::util::{max_opt, mean};
use chrono::Datelike;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Aggregated rows for one month plus what happened while building them.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    pub month: u32,
    pub year: i32,
    pub rows: Vec<MonthlyRow>,
    /// Rows whose date was blank or could not be parsed.
    pub skipped_rows: usize,
    /// Vehicles found in the period before any filter was applied.
    pub period_groups: usize,
}

impl MonthlyReport {
    fn empty(month: u32, year: i32, skipped_rows: usize) -> Self {
        Self {
            month,
            year,
            rows: Vec::new(),
            skipped_rows,
            period_groups: 0,
        }
    }

    /// No raw row fell inside the selected month/year.
    pub fn no_data_for_period(&self) -> bool {
        self.period_groups == 0
    }

    pub fn filtered(mut self, criteria: &FilterCriteria) -> Self {
        self.rows = apply_filters(&self.rows, criteria);
        self
    }
}

// Positions of the columns the aggregation reads.
struct Columns {
    vehicle: usize,
    base: usize,
    kind: usize,
    model: usize,
    plate: usize,
    date: usize,
    cost: usize,
    liters: usize,
    km: usize,
    hours_delta: usize,
    km_per_liter: usize,
    hours_per_liter: usize,
    odometer: usize,
    hours: usize,
}

impl Columns {
    fn resolve(table: &RawTable) -> Result<Self> {
        Ok(Self {
            vehicle: table.require_column(COL_VEHICLE)?,
            base: table.require_column(COL_BASE)?,
            kind: table.require_column(COL_TYPE)?,
            model: table.require_column(COL_MODEL)?,
            plate: table.require_column(COL_PLATE)?,
            date: table.require_column(COL_DATE)?,
            cost: table.require_column(COL_TOTAL_COST)?,
            liters: table.require_column(COL_TOTAL_LITERS)?,
            km: table.require_column(COL_TOTAL_KM)?,
            hours_delta: table.require_column(COL_TOTAL_HOURS)?,
            km_per_liter: table.require_column(COL_AVG_KM_PER_LITER)?,
            hours_per_liter: table.require_column(COL_AVG_HOURS_PER_LITER)?,
            odometer: table.require_column(COL_ODOMETER)?,
            hours: table.require_column(COL_HOURS)?,
        })
    }
}

type GroupKey = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

#[derive(Default)]
struct Acc {
    total_cost: f64,
    total_liters: f64,
    total_km: f64,
    total_hours: f64,
    km_per_liter: Vec<f64>,
    hours_per_liter: Vec<f64>,
    odometer: Option<f64>,
    hours: Option<f64>,
}

/// Group one month of raw rows by vehicle identity.
///
/// Rows are keyed on (vehicle, base, type, model, plate); blank cells take
/// part in the key as `None`. Sums skip blanks, means and maxes ignore them
/// and stay `None` when a group has no value at all. Output is ordered by
/// key, so the same input always produces the same report.
pub fn monthly_analysis(table: &RawTable, month: u32, year: i32) -> Result<MonthlyReport> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidPeriod { month, year });
    }
    if table.is_empty() {
        return Ok(MonthlyReport::empty(month, year, 0));
    }
    let cols = Columns::resolve(table)?;

    let mut skipped_rows = 0usize;
    let mut groups: BTreeMap<GroupKey, Acc> = BTreeMap::new();
    for row in &table.rows {
        let Some(date) = table.cell(row, cols.date).as_datetime() else {
            skipped_rows += 1;
            continue;
        };
        if date.month() != month || date.year() != year {
            continue;
        }

        let text = |idx: usize| table.cell(row, idx).as_text();
        let num = |idx: usize| table.cell(row, idx).as_f64();
        let key = (
            text(cols.vehicle),
            text(cols.base),
            text(cols.kind),
            text(cols.model),
            text(cols.plate),
        );
        let e = groups.entry(key).or_default();
        e.total_cost += num(cols.cost).unwrap_or(0.0);
        e.total_liters += num(cols.liters).unwrap_or(0.0);
        e.total_km += num(cols.km).unwrap_or(0.0);
        e.total_hours += num(cols.hours_delta).unwrap_or(0.0);
        e.km_per_liter.extend(num(cols.km_per_liter));
        e.hours_per_liter.extend(num(cols.hours_per_liter));
        e.odometer = max_opt(e.odometer, num(cols.odometer));
        e.hours = max_opt(e.hours, num(cols.hours));
    }

    if skipped_rows > 0 {
        warn!("{} rows skipped due to a blank or unreadable date", skipped_rows);
    }
    if groups.is_empty() {
        debug!("No rows for {}/{}", month, year);
        return Ok(MonthlyReport::empty(month, year, skipped_rows));
    }

    let rows: Vec<MonthlyRow> = groups
        .into_iter()
        .map(|((vehicle, base, kind, model, plate), acc)| MonthlyRow {
            vehicle,
            base,
            kind,
            model,
            plate,
            total_cost: acc.total_cost,
            total_liters: acc.total_liters,
            total_km: acc.total_km,
            total_hours: acc.total_hours,
            avg_km_per_liter: mean(&acc.km_per_liter),
            avg_hours_per_liter: mean(&acc.hours_per_liter),
            odometer: acc.odometer,
            hours: acc.hours,
        })
        .collect();
    debug!("{} vehicles in {}/{}", rows.len(), month, year);

    Ok(MonthlyReport {
        month,
        year,
        period_groups: rows.len(),
        rows,
        skipped_rows,
    })
}

/// Aggregate the period and narrow it with `criteria` in one call.
pub fn build_report(
    table: &RawTable,
    month: u32,
    year: i32,
    criteria: &FilterCriteria,
) -> Result<MonthlyReport> {
    Ok(monthly_analysis(table, month, year)?.filtered(criteria))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::normalize::normalize_columns;
    use crate::types::Cell;
    use std::collections::{HashMap, HashSet};

    pub(crate) const SOURCE_HEADERS: [&str; 14] = [
        "Veículo/Equip.",
        "Base",
        "Tipo",
        "Modelo",
        "PLACA/",
        "Data",
        "Custo Gás",
        "Litros",
        "Dif Km",
        "Dif Hr",
        "Km/Lt",
        "Hr/Lt",
        "KmAtual",
        "Horas",
    ];

    pub(crate) struct Event<'a> {
        pub vehicle: &'a str,
        pub base: &'a str,
        pub plate: &'a str,
        pub date: &'a str,
        pub cost: f64,
        pub liters: f64,
        pub km: f64,
        pub odometer: f64,
    }

    pub(crate) fn event<'a>(vehicle: &'a str, date: &'a str, cost: f64, liters: f64) -> Event<'a> {
        Event {
            vehicle,
            base: "Norte",
            plate: "ABC1234",
            date,
            cost,
            liters,
            km: liters * 4.0,
            odometer: 10_000.0 + cost,
        }
    }

    pub(crate) fn table(events: &[Event]) -> RawTable {
        let rows = events
            .iter()
            .map(|e| {
                vec![
                    Cell::from_text(e.vehicle),
                    Cell::from_text(e.base),
                    Cell::Text("Betoneira".into()),
                    Cell::Text("Atego 2426".into()),
                    Cell::from_text(e.plate),
                    Cell::from_text(e.date),
                    Cell::Number(e.cost),
                    Cell::Number(e.liters),
                    Cell::Number(e.km),
                    Cell::Number(e.liters / 5.0),
                    Cell::Number(e.km / e.liters),
                    Cell::Number(0.2),
                    Cell::Number(e.odometer),
                    Cell::Number(e.odometer / 10.0),
                ]
            })
            .collect();
        normalize_columns(RawTable::new(
            SOURCE_HEADERS.iter().map(|h| h.to_string()).collect(),
            rows,
        ))
    }

    #[test]
    fn test_two_refuels_in_march_are_summed() {
        let t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            event("T-01", "2024-03-19", 50.0, 10.0),
        ]);
        let report = monthly_analysis(&t, 3, 2024).unwrap();
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.vehicle.as_deref(), Some("T-01"));
        assert_eq!(row.total_cost, 150.0);
        assert_eq!(row.total_liters, 30.0);
        assert_eq!(row.total_km, 120.0);
        assert_eq!(row.avg_km_per_liter, Some(4.0));
        assert_eq!(row.odometer, Some(10_100.0));
        assert!(!report.no_data_for_period());
    }

    #[test]
    fn test_other_months_and_years_are_excluded() {
        let t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            event("T-01", "2024-04-01", 999.0, 99.0),
            event("T-01", "2023-03-05", 999.0, 99.0),
        ]);
        let report = monthly_analysis(&t, 3, 2024).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].total_cost, 100.0);
    }

    #[test]
    fn test_period_without_rows_flags_no_data() {
        let t = table(&[event("T-01", "2024-03-05", 100.0, 20.0)]);
        let report = monthly_analysis(&t, 7, 2030).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.no_data_for_period());
    }

    #[test]
    fn test_empty_table_flags_no_data() {
        let report = monthly_analysis(&RawTable::default(), 1, 2024).unwrap();
        assert!(report.no_data_for_period());
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        let t = table(&[event("T-01", "2024-03-05", 100.0, 20.0)]);
        assert!(matches!(
            monthly_analysis(&t, 13, 2024),
            Err(ReportError::InvalidPeriod { month: 13, .. })
        ));
        assert!(monthly_analysis(&t, 0, 2024).is_err());
    }

    #[test]
    fn test_missing_column_is_reported() {
        let mut t = table(&[event("T-01", "2024-03-05", 100.0, 20.0)]);
        t.headers[12] = "Odometro".into();
        let err = monthly_analysis(&t, 3, 2024).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn(ref c) if c == "KmAtual"));
    }

    #[test]
    fn test_unreadable_dates_are_skipped_and_counted() {
        let t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            event("T-01", "soon", 50.0, 10.0),
            event("T-01", "", 50.0, 10.0),
        ]);
        let report = monthly_analysis(&t, 3, 2024).unwrap();
        assert_eq!(report.skipped_rows, 2);
        assert_eq!(report.rows[0].total_cost, 100.0);
    }

    #[test]
    fn test_keys_are_unique_and_ordered() {
        let t = table(&[
            event("T-02", "2024-03-01", 10.0, 1.0),
            event("T-01", "2024-03-02", 10.0, 1.0),
            event("T-02", "2024-03-03", 10.0, 1.0),
            Event {
                base: "Sul",
                ..event("T-01", "2024-03-04", 10.0, 1.0)
            },
        ]);
        let report = monthly_analysis(&t, 3, 2024).unwrap();
        let keys: Vec<_> = report.rows.iter().map(|r| r.key_fields()).collect();
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
        assert_eq!(
            report
                .rows
                .iter()
                .map(|r| (r.vehicle.as_deref().unwrap(), r.base.as_deref().unwrap()))
                .collect::<Vec<_>>(),
            vec![("T-01", "Norte"), ("T-01", "Sul"), ("T-02", "Norte")]
        );
    }

    #[test]
    fn test_aggregates_match_manual_grouping() {
        let events = [
            event("T-01", "2024-05-01", 120.0, 30.0),
            event("T-02", "2024-05-02", 80.0, 16.0),
            event("T-01", "2024-05-10", 60.0, 12.0),
            event("T-03", "2024-05-11", 40.0, 10.0),
            event("T-02", "2024-05-20", 90.0, 18.0),
            event("T-01", "2024-05-28", 75.0, 25.0),
        ];
        let report = monthly_analysis(&table(&events), 5, 2024).unwrap();

        let mut expected: HashMap<&str, (f64, f64, Vec<f64>, f64)> = HashMap::new();
        for e in &events {
            let entry = expected
                .entry(e.vehicle)
                .or_insert((0.0, 0.0, Vec::new(), f64::MIN));
            entry.0 += e.cost;
            entry.1 += e.liters;
            entry.2.push(e.km / e.liters);
            entry.3 = entry.3.max(e.odometer);
        }

        assert_eq!(report.rows.len(), expected.len());
        for row in &report.rows {
            let (cost, liters, ratios, odometer) = &expected[row.vehicle.as_deref().unwrap()];
            assert!((row.total_cost - cost).abs() < 1e-9);
            assert!((row.total_liters - liters).abs() < 1e-9);
            let avg = ratios.iter().sum::<f64>() / ratios.len() as f64;
            assert!((row.avg_km_per_liter.unwrap() - avg).abs() < 1e-9);
            assert_eq!(row.odometer, Some(*odometer));
        }
    }

    #[test]
    fn test_blank_values_are_ignored_by_aggregates() {
        let mut t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            event("T-01", "2024-03-06", 50.0, 10.0),
        ]);
        let ratio_idx = t.column_index(COL_AVG_HOURS_PER_LITER).unwrap();
        let cost_idx = t.column_index(COL_TOTAL_COST).unwrap();
        for row in &mut t.rows {
            row[ratio_idx] = Cell::Empty;
        }
        t.rows[1][cost_idx] = Cell::Empty;

        let report = monthly_analysis(&t, 3, 2024).unwrap();
        let row = &report.rows[0];
        assert_eq!(row.total_cost, 100.0);
        assert_eq!(row.avg_hours_per_liter, None);
    }

    #[test]
    fn test_blank_identity_fields_form_their_own_group() {
        let t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            Event {
                plate: "",
                ..event("T-01", "2024-03-06", 50.0, 10.0)
            },
        ]);
        let report = monthly_analysis(&t, 3, 2024).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().any(|r| r.plate.is_none()));
    }

    #[test]
    fn test_build_report_keeps_period_flag_after_filtering() {
        let t = table(&[event("T-01", "2024-03-05", 100.0, 20.0)]);
        let criteria = FilterCriteria::new(Some("nothing-matches"), None, None);
        let report = build_report(&t, 3, 2024, &criteria).unwrap();
        assert!(report.rows.is_empty());
        assert!(!report.no_data_for_period());
    }
}
