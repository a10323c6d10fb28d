//! Filter state and its translation to query parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Filters applied to payroll queries. No status filter is applied unless
/// one is given explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DemographicFilters {
    /// Free-text search over name or ID.
    pub search: Option<String>,
    pub sucursales: Vec<String>,
    pub puestos: Vec<String>,
    pub puestos_categorias: Vec<String>,
    pub status: Vec<String>,
    /// Pay period, usually `YYYY-MM`.
    #[serde(alias = "periodFilter")]
    pub period: Option<String>,
}

impl DemographicFilters {
    pub fn with_period(mut self, period: Option<String>) -> Self {
        self.period = period;
        self
    }

    /// Query parameters in a stable order. Blank values are omitted and
    /// list filters repeat their key once per value.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = non_blank(self.search.as_deref()) {
            params.push(("search", search));
        }
        push_all(&mut params, "sucursal", &self.sucursales);
        push_all(&mut params, "puesto", &self.puestos);
        push_all(&mut params, "puestoCategorizado", &self.puestos_categorias);
        push_all(&mut params, "status", &self.status);
        if let Some(period) = non_blank(self.period.as_deref()) {
            params.push(("cveper", period));
        }
        params
    }

    /// Whether switching from `other` to `self` requires a reload.
    /// List filters compare as sets.
    pub fn differs_from(&self, other: &DemographicFilters) -> bool {
        non_blank(self.search.as_deref()) != non_blank(other.search.as_deref())
            || as_set(&self.sucursales) != as_set(&other.sucursales)
            || as_set(&self.puestos) != as_set(&other.puestos)
            || as_set(&self.puestos_categorias) != as_set(&other.puestos_categorias)
            || as_set(&self.status) != as_set(&other.status)
            || non_blank(self.period.as_deref()) != non_blank(other.period.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.to_params().is_empty()
    }
}

/// Parameters for one page of a paged payroll query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl PageQuery {
    pub fn params(&self, filters: &DemographicFilters) -> Vec<(&'static str, String)> {
        let mut params = filters.to_params();
        params.push(("page", self.page.to_string()));
        params.push(("pageSize", self.page_size.to_string()));
        params
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn push_all(params: &mut Vec<(&'static str, String)>, key: &'static str, values: &[String]) {
    for value in values {
        if let Some(value) = non_blank(Some(value)) {
            params.push((key, value));
        }
    }
}

fn as_set(values: &[String]) -> BTreeSet<&str> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect()
}
