//! Raw payroll rows and their canonical, typed form.
//!
//! Field names differ between endpoints (`curp`, `CURP`, `Curp`, `RFC`,
//! `costoNomina`, `totalPercepciones`, ...). Everything downstream of
//! [`normalize`] works on [`NormalizedRecord`] and never looks at raw keys.

use crate::curp::canonical_id;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const ID_MARKER: &str = "curp";
const ID_FALLBACK: &str = "rfc";
const AMOUNT_MARKERS: [&str; 3] = ["costo", "percepc", "total"];
const PERIOD_KEYS: [&str; 3] = ["periodo", "fecha_periodo", "cveper"];

/// A payroll row exactly as delivered by the API or read from a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayrollRecord(Map<String, Value>);

impl PayrollRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for PayrollRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A payroll row after alias resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Canonical (trimmed, uppercased) national ID, `None` when absent or blank.
    pub id: Option<String>,
    /// Monetary amount this row contributes; 0 when missing or unreadable.
    pub amount: f64,
    pub period: Option<String>,
    #[serde(skip)]
    pub fields: Map<String, Value>,
}

/// Resolves ID, amount and period aliases for one row.
pub fn normalize(record: &PayrollRecord) -> NormalizedRecord {
    let fields = record.fields();
    NormalizedRecord {
        id: find_id(fields),
        amount: find_amount(fields),
        period: find_period(fields),
        fields: fields.clone(),
    }
}

pub fn normalize_all(records: &[PayrollRecord]) -> Vec<NormalizedRecord> {
    records.iter().map(normalize).collect()
}

fn find_id(fields: &Map<String, Value>) -> Option<String> {
    let by_marker = fields
        .iter()
        .filter(|(key, _)| key.to_lowercase().contains(ID_MARKER))
        .find_map(|(_, value)| non_blank_text(value));

    by_marker
        .or_else(|| {
            fields
                .iter()
                .filter(|(key, _)| key.eq_ignore_ascii_case(ID_FALLBACK))
                .find_map(|(_, value)| non_blank_text(value))
        })
        .map(|id| canonical_id(&id))
}

fn find_amount(fields: &Map<String, Value>) -> f64 {
    fields
        .iter()
        .find(|(key, _)| {
            let key = key.to_lowercase();
            AMOUNT_MARKERS.iter().any(|marker| key.contains(marker))
        })
        .map(|(_, value)| parse_amount(value))
        .unwrap_or(0.0)
}

fn find_period(fields: &Map<String, Value>) -> Option<String> {
    PERIOD_KEYS.iter().find_map(|wanted| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(wanted))
            .and_then(|(_, value)| non_blank_text(value))
    })
}

fn non_blank_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Reads a monetary value. Non-numeric, non-finite and missing values count as 0.
pub fn parse_amount(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
