//! Wire shapes returned by the payroll API.

use payroll_pyramid::PayrollRecord;
use serde::{Deserialize, Serialize};

/// One page of `GET /api/payroll`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayrollPage {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<PayrollRecord>>,
    /// Total rows matching the filters across all pages.
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PayrollPage {
    pub fn ok(data: Vec<PayrollRecord>, total: Option<u64>) -> Self {
        Self {
            success: true,
            data: Some(data),
            total,
            error: None,
        }
    }

    pub fn into_records(self) -> Vec<PayrollRecord> {
        self.data.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodEntry {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// `GET /api/payroll/periodos`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodsResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<PeriodEntry>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `GET /api/payroll/demographic/unique-count`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueCountResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub unique_curp_count: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}
