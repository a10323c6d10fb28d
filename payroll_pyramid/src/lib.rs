//! Demographic pyramids from payroll records keyed by a CURP-style national ID.
//!
//! Raw rows are normalized once, collapsed to one entry per person, bucketed
//! by age and gender (optionally salary band), scaled, and turned into a
//! chart-ready [`PyramidView`].
//!
//! # Example
//!
//! ```ignore
//! use payroll_pyramid::{PayrollRecord, PyramidBuilder, PyramidVariant};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let records = vec![
//!         PayrollRecord::new().with("curp", "AAAA950615HAAAAA01").with("costoNomina", 1500.0),
//!         PayrollRecord::new().with("CURP", "BBBB880220MBBBBB02").with("costoNomina", 12000.0),
//!     ];
//!
//!     let results = PyramidBuilder::new(records)
//!         .variant(PyramidVariant::SalaryAge)
//!         .age_bounds(18, 70)
//!         .run()?;
//!
//!     results.summary();
//!     Ok(())
//! }
//! ```

use chrono::{Local, NaiveDate};
use comfy_table::{Cell, Table};
use getset::Getters;
use polars::prelude::{DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

pub mod aggregate;
pub mod api;
pub mod band;
pub mod config;
pub mod curp;
pub mod dedup;
pub mod ingest;
pub mod presentation;
pub mod range;
pub mod record;
mod report;
pub mod scale;

pub use crate::aggregate::{aggregate, aggregate_at, Aggregation, BucketKey, BucketSet, Dimensions};
pub use crate::band::SalaryBand;
pub use crate::config::PyramidConfig;
pub use crate::curp::{parse_gender, parse_identity, parse_identity_at, Gender, ParsedIdentity};
pub use crate::dedup::{deduplicate, Deduplication, UniquePerson};
pub use crate::presentation::{build_view, PyramidRow, PyramidView};
pub use crate::range::{compact_range, RowOrder};
pub use crate::record::{normalize, normalize_all, NormalizedRecord, PayrollRecord};
pub use crate::scale::{compute_scale, ScaleConfig, ScaleContext};

/// Error type for the `payroll_pyramid` library.
///
/// The pipeline itself never fails; errors come from reading input or from
/// configuration that cannot produce a chart.
#[derive(Debug, thiserror::Error)]
pub enum PyramidError {
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Input parsed but does not have the expected shape.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Which pyramid to build. Both run the same pipeline with different buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PyramidVariant {
    /// Age × gender.
    #[default]
    Population,
    /// Age × gender × salary band.
    SalaryAge,
}

impl PyramidVariant {
    pub fn dimensions(&self) -> Dimensions {
        match self {
            PyramidVariant::Population => Dimensions::AgeGender,
            PyramidVariant::SalaryAge => Dimensions::AgeGenderBand,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PyramidVariant::Population => "Population Pyramid",
            PyramidVariant::SalaryAge => "Salary and Age Pyramid",
        }
    }
}

impl fmt::Display for PyramidVariant {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PyramidVariant::Population => write!(f, "population"),
            PyramidVariant::SalaryAge => write!(f, "salary_age"),
        }
    }
}

impl FromStr for PyramidVariant {
    type Err = PyramidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "population" => Ok(PyramidVariant::Population),
            "salary" | "salary_age" | "salary-age" => Ok(PyramidVariant::SalaryAge),
            other => Err(PyramidError::InvalidConfig(format!(
                "unknown pyramid variant '{}' (expected population or salary_age)",
                other
            ))),
        }
    }
}

/// The main entry point for configuring and running the pipeline.
#[derive(Debug, Clone)]
pub struct PyramidBuilder {
    records: Vec<PayrollRecord>,
    variant: PyramidVariant,
    config: PyramidConfig,
    reference_date: Option<NaiveDate>,
}

impl PyramidBuilder {
    pub fn new(records: Vec<PayrollRecord>) -> Self {
        Self {
            records,
            variant: PyramidVariant::default(),
            config: PyramidConfig::default(),
            reference_date: None,
        }
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self, PyramidError> {
        Ok(Self::new(ingest::records_from_dataframe(df)?))
    }

    pub fn variant(&mut self, variant: PyramidVariant) -> &mut Self {
        self.variant = variant;
        self
    }

    /// Inclusive age bounds for the rendered rows.
    pub fn age_bounds(&mut self, min_age: i32, max_age: i32) -> &mut Self {
        self.config.min_age = min_age;
        self.config.max_age = max_age;
        self
    }

    pub fn scale(&mut self, scale: ScaleConfig) -> &mut Self {
        self.config.scale = scale;
        self
    }

    pub fn order(&mut self, order: RowOrder) -> &mut Self {
        self.config.order = order;
        self
    }

    pub fn config(&mut self, config: PyramidConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// Date ages are computed against. Defaults to today on the local clock.
    pub fn reference_date(&mut self, date: NaiveDate) -> &mut Self {
        self.reference_date = Some(date);
        self
    }

    pub fn run(&self) -> Result<PyramidResults, PyramidError> {
        self.config.validate()?;
        let today = self
            .reference_date
            .unwrap_or_else(|| Local::now().date_naive());

        let normalized = normalize_all(&self.records);
        let dedup = deduplicate(&normalized);
        let total_records = *dedup.total_records();
        let invalid_id_count = *dedup.invalid_id_count();
        let unique_persons = dedup.unique_count();

        let aggregation = aggregate_at(dedup.persons(), self.variant.dimensions(), today);
        let ages = compact_range(
            aggregation.buckets(),
            self.config.min_age,
            self.config.max_age,
            self.config.order,
        );
        // Only rendered ages may set the largest bar.
        let visible = aggregation
            .buckets()
            .within_ages(self.config.min_age, self.config.max_age);
        let scale = compute_scale(&visible, &self.config.scale);
        let view = build_view(&aggregation, &scale, &ages);

        info!(
            variant = %self.variant,
            records = total_records,
            persons = unique_persons,
            rows = view.rows().len(),
            "built pyramid"
        );

        Ok(PyramidResults {
            variant: self.variant,
            config: self.config,
            reference_date: today,
            total_records,
            unique_persons,
            invalid_id_count,
            aggregation,
            view,
        })
    }
}

/// Holds everything produced by one pipeline run.
#[derive(Debug, Clone, Getters, Serialize)]
#[getset(get = "pub")]
pub struct PyramidResults {
    variant: PyramidVariant,
    config: PyramidConfig,
    /// Date ages were computed against.
    reference_date: NaiveDate,
    total_records: usize,
    unique_persons: usize,
    /// Rows that carried no usable national ID.
    invalid_id_count: usize,
    aggregation: Aggregation,
    view: PyramidView,
}

impl PyramidResults {
    /// Prints a formatted summary of the pyramid to the console.
    pub fn summary(&self) {
        let diagnostics = self.aggregation.diagnostics();
        let stats = self.aggregation.stats();

        println!("Demographic Pyramid Results");
        println!("========================================");
        println!("Variant: {}", self.variant);
        println!("Records read: {}", self.total_records);
        println!("Unique persons: {}", self.unique_persons);
        println!("Rows without ID: {}", self.invalid_id_count);
        println!("Unreadable IDs: {}", diagnostics.invalid_identity());
        println!("Unknown gender: {}", diagnostics.unknown_gender());
        println!();

        let mut stats_table = Table::new();
        stats_table.set_header(vec!["Group", "Persons", "Share"]);
        stats_table.add_row(vec![
            Cell::new("Women"),
            Cell::new(stats.female()),
            Cell::new(format!("{:.1}%", stats.female_percentage())),
        ]);
        stats_table.add_row(vec![
            Cell::new("Men"),
            Cell::new(stats.male()),
            Cell::new(format!("{:.1}%", stats.male_percentage())),
        ]);
        println!("{}", stats_table);
        println!("Average age: {:.1}", stats.average_age());
        println!("Average total amount: {:.2}", stats.average_amount());

        if !stats.bands().is_empty() {
            let mut band_table = Table::new();
            band_table.set_header(vec!["Band", "Range", "Women", "Men", "Total"]);
            for band in stats.bands() {
                band_table.add_row(vec![
                    Cell::new(band.band().name()),
                    Cell::new(band.band().label()),
                    Cell::new(band.female()),
                    Cell::new(band.male()),
                    Cell::new(band.total()),
                ]);
            }
            println!("\nSalary Bands");
            println!("{}", band_table);
        }

        match &self.view {
            PyramidView::Empty { message } => println!("\n{}", message),
            PyramidView::Chart { rows, .. } => {
                let mut rows_table = Table::new();
                rows_table.set_header(vec!["Age", "Women", "Men"]);
                for row in rows {
                    rows_table.add_row(vec![
                        Cell::new(row.age),
                        Cell::new(row.female_total()),
                        Cell::new(row.male_total()),
                    ]);
                }
                println!("\nPersons by Age");
                println!("{}", rows_table);
            }
        }
    }

    /// Exports the rows to a Markdown table.
    pub fn to_markdown(&self) -> String {
        let stats = self.aggregation.stats();
        let mut md = String::new();
        md.push_str(&format!("### {}\n\n", self.variant.title()));
        md.push_str(&format!(
            "Unique persons: {} | Women: {} | Men: {} | Average age: {:.1}\n\n",
            self.unique_persons,
            stats.female(),
            stats.male(),
            stats.average_age()
        ));
        md.push_str("| Age | Women | Men |\n");
        md.push_str("|---|---|---|\n");
        for row in self.view.rows() {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                row.age,
                row.female_total(),
                row.male_total()
            ));
        }
        md
    }

    /// Exports the results to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Renders a standalone HTML page with the chart.
    pub fn to_html(&self) -> String {
        report::render(self)
    }
}

// --- Wasm Wrappers ---

#[cfg(feature = "wasm")]
mod wasm {
    use crate::api::{pyramid_inner, PyramidRequest};
    use crate::PyramidVariant;
    use wasm_bindgen::prelude::*;

    #[wasm_bindgen]
    pub fn init_panic_hook() {
        console_error_panic_hook::set_once();
    }

    #[wasm_bindgen]
    pub fn population_pyramid(val: JsValue) -> Result<JsValue, JsValue> {
        let req: PyramidRequest = serde_wasm_bindgen::from_value(val)?;
        let res = pyramid_inner(req, PyramidVariant::Population).map_err(|e| JsValue::from_str(&e))?;
        Ok(serde_wasm_bindgen::to_value(&res)?)
    }

    #[wasm_bindgen]
    pub fn salary_age_pyramid(val: JsValue) -> Result<JsValue, JsValue> {
        let req: PyramidRequest = serde_wasm_bindgen::from_value(val)?;
        let res = pyramid_inner(req, PyramidVariant::SalaryAge).map_err(|e| JsValue::from_str(&e))?;
        Ok(serde_wasm_bindgen::to_value(&res)?)
    }
}
