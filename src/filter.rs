use crate::types::MonthlyRow;

/// Optional substring filters applied to the monthly table.
///
/// Matching is case-insensitive. `vehicle_or_plate` accepts a row when either
/// the vehicle id or the plate contains it; the three criteria are combined
/// with AND. A row with a blank value never matches a filter on that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub vehicle_or_plate: Option<String>,
    pub base: Option<String>,
    pub kind: Option<String>,
}

impl FilterCriteria {
    /// Build criteria from raw user input. Blank values mean "no filter".
    pub fn new(vehicle_or_plate: Option<&str>, base: Option<&str>, kind: Option<&str>) -> Self {
        Self {
            vehicle_or_plate: needle(vehicle_or_plate),
            base: needle(base),
            kind: needle(kind),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vehicle_or_plate.is_none() && self.base.is_none() && self.kind.is_none()
    }

    pub fn matches(&self, row: &MonthlyRow) -> bool {
        if let Some(q) = &self.vehicle_or_plate {
            if !contains_ci(row.vehicle.as_deref(), q) && !contains_ci(row.plate.as_deref(), q) {
                return false;
            }
        }
        if let Some(q) = &self.base {
            if !contains_ci(row.base.as_deref(), q) {
                return false;
            }
        }
        if let Some(q) = &self.kind {
            if !contains_ci(row.kind.as_deref(), q) {
                return false;
            }
        }
        true
    }
}

// Needles are stored lowercased.
fn needle(s: Option<&str>) -> Option<String> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_lowercase())
    }
}

fn contains_ci(field: Option<&str>, needle: &str) -> bool {
    field.is_some_and(|f| f.to_lowercase().contains(needle))
}

pub fn apply_filters(rows: &[MonthlyRow], criteria: &FilterCriteria) -> Vec<MonthlyRow> {
    if criteria.is_empty() {
        return rows.to_vec();
    }
    rows.iter().filter(|r| criteria.matches(r)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::monthly_analysis;
    use crate::reports::tests::{event, table, Event};

    fn rows() -> Vec<MonthlyRow> {
        let t = table(&[
            event("T-01", "2024-03-05", 100.0, 20.0),
            Event {
                base: "Sul",
                plate: "XyZ9A87",
                ..event("BT-07", "2024-03-06", 50.0, 10.0)
            },
            Event {
                plate: "",
                ..event("T-09", "2024-03-07", 70.0, 14.0)
            },
        ]);
        monthly_analysis(&t, 3, 2024).unwrap().rows
    }

    #[test]
    fn test_no_criteria_returns_input_unchanged() {
        let input = rows();
        let criteria = FilterCriteria::new(None, Some("  "), Some(""));
        assert!(criteria.is_empty());
        assert_eq!(apply_filters(&input, &criteria), input);
    }

    #[test]
    fn test_vehicle_or_plate_matches_either_field() {
        let input = rows();

        let by_vehicle = apply_filters(&input, &FilterCriteria::new(Some("bt-0"), None, None));
        assert_eq!(by_vehicle.len(), 1);
        assert_eq!(by_vehicle[0].vehicle.as_deref(), Some("BT-07"));

        let by_plate = apply_filters(&input, &FilterCriteria::new(Some("xYz9"), None, None));
        assert_eq!(by_plate.len(), 1);
        assert_eq!(by_plate[0].plate.as_deref(), Some("XyZ9A87"));

        let both = apply_filters(&input, &FilterCriteria::new(Some("T-0"), None, None));
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn test_blank_field_does_not_match() {
        let input = rows();
        let by_plate = apply_filters(&input, &FilterCriteria::new(Some("abc"), None, None));
        assert!(by_plate.iter().all(|r| r.plate.is_some()));
        assert_eq!(by_plate.len(), 1);
    }

    #[test]
    fn test_criteria_are_combined_with_and() {
        let input = rows();
        let criteria = FilterCriteria::new(Some("t-0"), Some("NORTE"), Some("beton"));
        let out = apply_filters(&input, &criteria);
        assert_eq!(
            out.iter()
                .map(|r| r.vehicle.as_deref().unwrap())
                .collect::<Vec<_>>(),
            vec!["T-01", "T-09"]
        );

        let none = apply_filters(&input, &FilterCriteria::new(None, Some("sul"), Some("caçamba")));
        assert!(none.is_empty());
    }
}
