use crate::source::PayrollSource;
use crate::types::PeriodEntry;
use chrono::{DateTime, NaiveDate};
use tracing::{debug, warn};

/// Reads a period value such as `2024-10-01`, `2024-10-01T00:00:00Z`
/// or `2024-10`.
pub fn parse_period(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Some(date) = value
        .get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
    {
        return Some(date);
    }
    NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d").ok()
}

/// Most recent parseable period as a `YYYY-MM` month filter.
pub fn latest_period(entries: &[PeriodEntry]) -> Option<String> {
    entries
        .iter()
        .filter_map(|entry| parse_period(&entry.value))
        .max()
        .map(|date| date.format("%Y-%m").to_string())
}

/// Latest period from the server. Any failure means no period filter.
pub async fn resolve_latest_period<S: PayrollSource + ?Sized>(source: &S) -> Option<String> {
    match source.fetch_periods().await {
        Ok(entries) => {
            let latest = latest_period(&entries);
            match &latest {
                Some(period) => debug!(%period, candidates = entries.len(), "resolved latest period"),
                None => warn!(candidates = entries.len(), "no usable pay period; loading without period filter"),
            }
            latest
        }
        Err(e) => {
            warn!(error = %e, "could not load pay periods; loading without period filter");
            None
        }
    }
}
