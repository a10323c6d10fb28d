//! Remote loading for payroll pyramids.
//!
//! Pages are pulled sequentially from the payroll API, optionally scoped to
//! the latest pay period, and fed through the `payroll_pyramid` pipeline.
//! [`PyramidSession`] keeps filter-driven reloads from applying stale data.

pub mod config;
mod error;
pub mod filters;
pub mod loader;
pub mod period;
pub mod session;
pub mod source;
pub mod types;

pub use crate::config::ClientConfig;
pub use crate::error::ClientError;
pub use crate::filters::{DemographicFilters, PageQuery};
pub use crate::loader::{load_all_pages, LoadOutcome};
pub use crate::period::{latest_period, resolve_latest_period};
pub use crate::session::{LoadResult, PyramidSession, RequestGeneration, RequestToken};
pub use crate::source::{HttpPayrollSource, PayrollSource};

use chrono::NaiveDate;
use payroll_pyramid::{PyramidBuilder, PyramidConfig, PyramidResults, PyramidVariant};
use tracing::warn;

/// How a remote load is turned into a pyramid.
#[derive(Debug, Clone, Default)]
pub struct PyramidOptions {
    pub variant: PyramidVariant,
    pub config: PyramidConfig,
    /// Scope to the newest pay period when the filters name none.
    pub use_latest_period: bool,
    pub reference_date: Option<NaiveDate>,
}

/// Loads every page for `filters` and builds the pyramid.
///
/// Page failures after some data arrived give [`LoadResult::Partial`];
/// a failure before any data gives [`LoadResult::Failed`].
pub async fn load_pyramid<S: PayrollSource + ?Sized>(
    source: &S,
    filters: &DemographicFilters,
    client_config: &ClientConfig,
    options: &PyramidOptions,
) -> LoadResult<PyramidResults> {
    let mut filters = filters.clone();
    if options.use_latest_period && filters.period.is_none() {
        filters.period = resolve_latest_period(source).await;
    }

    let outcome = load_all_pages(source, &filters, client_config).await;
    let error = outcome.error.map(|e| e.to_string());
    if outcome.records.is_empty() {
        if let Some(error) = error {
            return LoadResult::Failed(error);
        }
    }

    let mut builder = PyramidBuilder::new(outcome.records);
    builder.variant(options.variant).config(options.config);
    if let Some(date) = options.reference_date {
        builder.reference_date(date);
    }
    let results = match builder.run() {
        Ok(results) => results,
        Err(e) => return LoadResult::Failed(e.to_string()),
    };

    match error {
        Some(error) => {
            warn!(%error, "pyramid built from partial data");
            LoadResult::Partial {
                value: results,
                error,
            }
        }
        None => LoadResult::Loaded(results),
    }
}
