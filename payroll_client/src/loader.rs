use crate::config::ClientConfig;
use crate::filters::{DemographicFilters, PageQuery};
use crate::source::PayrollSource;
use crate::ClientError;
use payroll_pyramid::PayrollRecord;
use tracing::{debug, info, warn};

/// Everything gathered by one paged load. `error` is set when the loop
/// stopped on a failure; `records` then holds what arrived before it.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub records: Vec<PayrollRecord>,
    pub pages_fetched: usize,
    /// `total` reported by the first page, if any.
    pub expected_total: Option<u64>,
    pub error: Option<ClientError>,
}

impl LoadOutcome {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Fetches pages 1, 2, ... strictly one after another.
///
/// Stops on a short or empty page, once the reported total is reached,
/// after `max_pages`, or on the first error.
pub async fn load_all_pages<S: PayrollSource + ?Sized>(
    source: &S,
    filters: &DemographicFilters,
    config: &ClientConfig,
) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    let page_size = config.page_size.max(1);

    for page in 1..=config.max_pages {
        let query = PageQuery { page, page_size };
        let result = match source.fetch_page(filters, query).await {
            Ok(result) => result,
            Err(e) => {
                warn!(page, error = %e, loaded = outcome.records.len(), "payroll page failed");
                outcome.error = Some(e);
                break;
            }
        };

        if page == 1 {
            outcome.expected_total = result.total;
        }
        let rows = result.into_records();
        let received = rows.len();
        outcome.pages_fetched += 1;
        outcome.records.extend(rows);
        debug!(page, received, loaded = outcome.records.len(), "payroll page loaded");

        if received < page_size {
            break;
        }
        if let Some(total) = outcome.expected_total {
            if outcome.records.len() as u64 >= total {
                break;
            }
        }
        if page == config.max_pages {
            warn!(max_pages = config.max_pages, "page limit reached before the last page");
        }
    }

    info!(
        records = outcome.records.len(),
        pages = outcome.pages_fetched,
        expected = ?outcome.expected_total,
        complete = outcome.is_complete(),
        "payroll load finished"
    );
    outcome
}
