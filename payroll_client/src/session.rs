//! Stale-result protection for filter-driven reloads.
//!
//! Every load is tagged with a [`RequestToken`]. Issuing a new token makes
//! all older ones stale, and [`PyramidSession::complete`] drops results
//! whose token is stale instead of applying them.

use crate::filters::DemographicFilters;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic generation counter. Can be shared between tasks.
#[derive(Debug, Default)]
pub struct RequestGeneration {
    current: AtomicU64,
}

impl RequestGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation, invalidating every earlier token.
    pub fn next(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }
}

/// Outcome of one load as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult<T> {
    Loaded(T),
    /// Some pages failed; `value` covers what arrived.
    Partial { value: T, error: String },
    /// Nothing usable arrived.
    Failed(String),
}

/// Application state for one pyramid: filters, last good value and error.
#[derive(Debug)]
pub struct PyramidSession<T> {
    generation: RequestGeneration,
    filters: DemographicFilters,
    current: Option<T>,
    error: Option<String>,
    loading: bool,
}

impl<T> PyramidSession<T> {
    pub fn new(filters: DemographicFilters) -> Self {
        Self {
            generation: RequestGeneration::new(),
            filters,
            current: None,
            error: None,
            loading: false,
        }
    }

    pub fn filters(&self) -> &DemographicFilters {
        &self.filters
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replaces the filters. Returns a token for the reload they require,
    /// or `None` when nothing relevant changed.
    pub fn set_filters(&mut self, filters: DemographicFilters) -> Option<RequestToken> {
        if !filters.differs_from(&self.filters) {
            return None;
        }
        self.filters = filters;
        Some(self.reload())
    }

    /// Starts a load with the current filters.
    pub fn reload(&mut self) -> RequestToken {
        self.loading = true;
        self.generation.next()
    }

    /// Applies a finished load. Returns `false` (and changes nothing) when
    /// `token` has been superseded.
    pub fn complete(&mut self, token: RequestToken, result: LoadResult<T>) -> bool {
        if !self.generation.is_current(token) {
            debug!(token = token.value(), "discarding stale load result");
            return false;
        }
        self.loading = false;
        match result {
            LoadResult::Loaded(value) => {
                self.current = Some(value);
                self.error = None;
            }
            LoadResult::Partial { value, error } => {
                self.current = Some(value);
                self.error = Some(error);
            }
            LoadResult::Failed(error) => {
                self.error = Some(error);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(period: &str) -> DemographicFilters {
        DemographicFilters::default().with_period(Some(period.to_string()))
    }

    #[test]
    fn test_tokens_supersede() {
        let generation = RequestGeneration::new();
        let first = generation.next();
        assert!(generation.is_current(first));
        let second = generation.next();
        assert!(!generation.is_current(first));
        assert!(generation.is_current(second));
    }

    #[test]
    fn test_stale_result_is_discarded() {
        let mut session = PyramidSession::new(filters("2024-09"));
        let old = session.set_filters(filters("2024-10")).unwrap();
        let new = session.set_filters(filters("2024-11")).unwrap();

        assert!(session.complete(new, LoadResult::Loaded("november")));
        assert!(!session.complete(old, LoadResult::Loaded("october")));
        assert_eq!(session.current(), Some(&"november"));
        assert!(!session.is_loading());
    }

    #[test]
    fn test_unchanged_filters_do_not_reload() {
        let mut session: PyramidSession<u32> = PyramidSession::new(filters("2024-10"));
        assert!(session.set_filters(filters("2024-10")).is_none());
        assert!(!session.is_loading());
    }

    #[test]
    fn test_failure_keeps_last_good_value() {
        let mut session = PyramidSession::new(DemographicFilters::default());
        let t1 = session.reload();
        session.complete(t1, LoadResult::Loaded(1));
        let t2 = session.reload();
        session.complete(t2, LoadResult::Failed("HTTP 500".to_string()));
        assert_eq!(session.current(), Some(&1));
        assert_eq!(session.error(), Some("HTTP 500"));

        let t3 = session.reload();
        session.complete(
            t3,
            LoadResult::Partial {
                value: 2,
                error: "page 3 failed".to_string(),
            },
        );
        assert_eq!(session.current(), Some(&2));
        assert_eq!(session.error(), Some("page 3 failed"));
    }
}
