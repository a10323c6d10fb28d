//! Request/response shapes shared by the tool server and the wasm bindings.

use crate::curp::{canonical_id, parse_gender, parse_identity_at, BirthDate, Gender};
use crate::ingest::{parse_json, read_csv_bytes};
use crate::range::RowOrder;
use crate::record::PayrollRecord;
use crate::scale::ScaleConfig;
use crate::{PyramidBuilder, PyramidResults, PyramidVariant};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

/// Input for a pyramid run. Rows come either inline or as CSV/JSON text.
#[derive(Deserialize, Debug, Default)]
pub struct PyramidRequest {
    pub records: Option<Vec<PayrollRecord>>,
    pub csv_content: Option<String>,
    pub json_content: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub target_max_width: Option<f64>,
    pub min_scale_factor: Option<f64>,
    pub order: Option<RowOrder>,
    /// `YYYY-MM-DD`; ages are computed against today when absent.
    pub reference_date: Option<NaiveDate>,
}

impl PyramidRequest {
    fn into_records(self) -> Result<Vec<PayrollRecord>, String> {
        if let Some(records) = self.records {
            return Ok(records);
        }
        if let Some(csv) = self.csv_content {
            return read_csv_bytes(csv.into_bytes()).map_err(|e| e.to_string());
        }
        if let Some(json) = self.json_content {
            return parse_json(&json).map_err(|e| e.to_string());
        }
        Err("One of records, csv_content or json_content is required.".to_string())
    }
}

pub fn pyramid_inner(req: PyramidRequest, variant: PyramidVariant) -> Result<PyramidResults, String> {
    let defaults = ScaleConfig::default();
    let scale = ScaleConfig {
        target_max_width: req.target_max_width.unwrap_or(defaults.target_max_width),
        min_scale_factor: req.min_scale_factor.unwrap_or(defaults.min_scale_factor),
    };
    let min_age = req.min_age;
    let max_age = req.max_age;
    let order = req.order;
    let reference_date = req.reference_date;

    let mut builder = PyramidBuilder::new(req.into_records()?);
    builder.variant(variant).scale(scale);
    if min_age.is_some() || max_age.is_some() {
        let defaults = crate::PyramidConfig::default();
        builder.age_bounds(
            min_age.unwrap_or(defaults.min_age),
            max_age.unwrap_or(defaults.max_age),
        );
    }
    if let Some(order) = order {
        builder.order(order);
    }
    if let Some(date) = reference_date {
        builder.reference_date(date);
    }
    builder.run().map_err(|e| e.to_string())
}

#[derive(Serialize, Debug, PartialEq)]
pub struct CurpResult {
    pub id: String,
    pub valid: bool,
    pub age: Option<i32>,
    pub gender: Gender,
    pub birth_date: Option<BirthDate>,
}

/// Decodes one identifier. Invalid IDs still report the gender-only reading.
pub fn parse_curp_inner(id: &str, reference_date: Option<NaiveDate>) -> CurpResult {
    let today = reference_date.unwrap_or_else(|| Local::now().date_naive());
    match parse_identity_at(id, today) {
        Some(identity) => CurpResult {
            id: canonical_id(id),
            valid: true,
            age: Some(identity.age),
            gender: identity.gender,
            birth_date: Some(identity.birth_date),
        },
        None => CurpResult {
            id: canonical_id(id),
            valid: false,
            age: None,
            gender: parse_gender(id),
            birth_date: None,
        },
    }
}
