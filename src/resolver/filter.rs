//! Hard filters and soft confidence boosts

use crate::records::{CanonicalRecord, QueryFilters};

fn contains_ci(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
}

/// Whether a record passes the studio, director and source type filters.
///
/// Tests are case-insensitive substring matches; a record without a value
/// for a filtered field fails.
pub fn passes(record: &CanonicalRecord, filters: &QueryFilters) -> bool {
    let checks = [
        (filters.studio.as_deref(), record.studio.as_deref()),
        (filters.director.as_deref(), record.director.as_deref()),
        (filters.source_type.as_deref(), record.source_type.as_deref()),
    ];
    checks
        .into_iter()
        .all(|(wanted, value)| wanted.map_or(true, |w| contains_ci(value, w)))
}

/// Confidence adjustment for how closely a record fits the filters.
pub fn boost(record: &CanonicalRecord, filters: &QueryFilters) -> f64 {
    let mut boost = 0.0;

    if let (Some(wanted), Some(year)) = (filters.year, record.year) {
        boost += match wanted.abs_diff(year) {
            0 => 0.06,
            1 => 0.03,
            _ => -0.03,
        };
    }
    if let (Some(wanted), Some(month)) = (filters.month, record.month) {
        boost += if wanted == month { 0.03 } else { -0.01 };
    }
    if let Some(studio) = filters.studio.as_deref() {
        if contains_ci(record.studio.as_deref(), studio) {
            boost += 0.05;
        }
    }
    if let Some(director) = filters.director.as_deref() {
        if contains_ci(record.director.as_deref(), director) {
            boost += 0.05;
        }
    }
    if let Some(source_type) = filters.source_type.as_deref() {
        if contains_ci(record.source_type.as_deref(), source_type) {
            boost += 0.03;
        }
    }
    boost
}

/// Drop records failing the hard filters and apply soft boosts to the rest.
pub fn filter_and_boost(records: Vec<CanonicalRecord>, filters: &QueryFilters) -> Vec<CanonicalRecord> {
    records
        .into_iter()
        .filter(|r| passes(r, filters))
        .map(|mut r| {
            let delta = boost(&r, filters);
            if delta != 0.0 {
                r.confidence = (r.confidence + delta).clamp(0.0, 1.0);
            }
            r
        })
        .collect()
}
