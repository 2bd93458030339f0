use crate::types::{
    RawTable, COL_AVG_HOURS_PER_LITER, COL_AVG_KM_PER_LITER, COL_TOTAL_COST, COL_TOTAL_HOURS,
    COL_TOTAL_KM, COL_TOTAL_LITERS,
};

/// Source header → canonical header. Headers not listed keep their name.
pub const COLUMN_RENAMES: [(&str, &str); 6] = [
    ("Custo Gás", COL_TOTAL_COST),
    ("Litros", COL_TOTAL_LITERS),
    ("Dif Km", COL_TOTAL_KM),
    ("Dif Hr", COL_TOTAL_HOURS),
    ("Km/Lt", COL_AVG_KM_PER_LITER),
    ("Hr/Lt", COL_AVG_HOURS_PER_LITER),
];

pub fn canonical_name(header: &str) -> String {
    let header = header.trim();
    COLUMN_RENAMES
        .iter()
        .find(|(source, _)| *source == header)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| header.to_string())
}

/// Rename known source headers to their canonical names. Cell values are
/// untouched, and a table that is already normalized comes back unchanged.
pub fn normalize_columns(mut table: RawTable) -> RawTable {
    for header in &mut table.headers {
        *header = canonical_name(header);
    }
    table
}
