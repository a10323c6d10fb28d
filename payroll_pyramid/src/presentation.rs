//! Turns buckets into something a chart can draw.
//!
//! Female bars go on the left, male bars on the right. Widths come from
//! the shared [`ScaleContext`] so both halves are comparable.

use crate::aggregate::{Aggregation, BucketSet, Dimensions};
use crate::band::SalaryBand;
use crate::curp::Gender;
use crate::scale::ScaleContext;
use serde::Serialize;

pub const FEMALE_COLOR: &str = "linear-gradient(90deg, #ff69b4, #ff1493)";
pub const MALE_COLOR: &str = "linear-gradient(90deg, #4169e1, #0066cc)";
pub const EMPTY_MESSAGE: &str = "No demographic data available for the selected filters";

const AVAILABLE_HEIGHT_PX: f64 = 600.0;
const X_AXIS_HEIGHT_PX: f64 = 50.0;
const MIN_ROW_HEIGHT_PX: f64 = 15.0;
const MAX_ROW_HEIGHT_PX: f64 = 25.0;
const ROW_GAP_PX: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub count: u32,
    pub width_percent: f64,
    pub color: &'static str,
    pub tooltip: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<SalaryBand>,
}

/// One age line of the chart. Band variants carry one segment per
/// populated band, lowest band first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PyramidRow {
    pub age: i32,
    pub female: Vec<Bar>,
    pub male: Vec<Bar>,
}

impl PyramidRow {
    pub fn female_total(&self) -> u32 {
        self.female.iter().map(|b| b.count).sum()
    }

    pub fn male_total(&self) -> u32 {
        self.male.iter().map(|b| b.count).sum()
    }
}

/// Pixel sizes are fractional; rounding is left to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartLayout {
    pub row_height_px: f64,
    pub chart_height_px: f64,
}

impl ChartLayout {
    /// Fits `rows` into the available height, keeping rows readable.
    pub fn for_rows(rows: usize) -> Self {
        let rows = rows.max(1) as f64;
        let row_height_px = ((AVAILABLE_HEIGHT_PX - X_AXIS_HEIGHT_PX) / rows)
            .clamp(MIN_ROW_HEIGHT_PX, MAX_ROW_HEIGHT_PX);
        Self {
            row_height_px,
            chart_height_px: rows * (row_height_px + ROW_GAP_PX) + X_AXIS_HEIGHT_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PyramidView {
    Empty {
        message: String,
    },
    Chart {
        rows: Vec<PyramidRow>,
        scale: ScaleContext,
        layout: ChartLayout,
        legend: Vec<LegendEntry>,
    },
}

impl PyramidView {
    pub fn is_empty(&self) -> bool {
        matches!(self, PyramidView::Empty { .. })
    }

    pub fn rows(&self) -> &[PyramidRow] {
        match self {
            PyramidView::Empty { .. } => &[],
            PyramidView::Chart { rows, .. } => rows,
        }
    }
}

/// Builds the chart for `ages` (already compacted and ordered).
///
/// Falls back to [`PyramidView::Empty`] when there are no rows or nothing
/// was counted.
pub fn build_view(aggregation: &Aggregation, scale: &ScaleContext, ages: &[i32]) -> PyramidView {
    if ages.is_empty() || *scale.global_max() == 0 {
        return PyramidView::Empty {
            message: EMPTY_MESSAGE.to_string(),
        };
    }

    let buckets = aggregation.buckets();
    let dimensions = *aggregation.dimensions();
    let rows = ages
        .iter()
        .map(|&age| PyramidRow {
            age,
            female: side_bars(buckets, scale, dimensions, age, Gender::Female),
            male: side_bars(buckets, scale, dimensions, age, Gender::Male),
        })
        .collect::<Vec<_>>();

    PyramidView::Chart {
        layout: ChartLayout::for_rows(rows.len()),
        rows,
        scale: scale.clone(),
        legend: legend(dimensions),
    }
}

fn side_bars(
    buckets: &BucketSet,
    scale: &ScaleContext,
    dimensions: Dimensions,
    age: i32,
    gender: Gender,
) -> Vec<Bar> {
    match dimensions {
        Dimensions::AgeGender => {
            let count = buckets.count_at(age, gender, None);
            vec![Bar {
                count,
                width_percent: scale.bar_width(count),
                color: gender_color(gender),
                tooltip: tooltip(age, count, gender, None),
                band: None,
            }]
        }
        Dimensions::AgeGenderBand => SalaryBand::ALL
            .iter()
            .filter_map(|&band| {
                let count = buckets.count_at(age, gender, Some(band));
                (count > 0).then(|| Bar {
                    count,
                    width_percent: scale.bar_width(count),
                    color: band.color(),
                    tooltip: tooltip(age, count, gender, Some(band)),
                    band: Some(band),
                })
            })
            .collect(),
    }
}

fn gender_color(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => FEMALE_COLOR,
        _ => MALE_COLOR,
    }
}

fn tooltip(age: i32, count: u32, gender: Gender, band: Option<SalaryBand>) -> String {
    let who = match gender {
        Gender::Female => "women",
        Gender::Male => "men",
        Gender::Unknown => "persons",
    };
    match band {
        Some(band) => format!("{age} years: {count} {who}, {}", band.label()),
        None => format!("{age} years: {count} {who}"),
    }
}

fn legend(dimensions: Dimensions) -> Vec<LegendEntry> {
    match dimensions {
        Dimensions::AgeGender => vec![
            LegendEntry {
                label: "Women".to_string(),
                color: FEMALE_COLOR,
            },
            LegendEntry {
                label: "Men".to_string(),
                color: MALE_COLOR,
            },
        ],
        Dimensions::AgeGenderBand => SalaryBand::ALL
            .iter()
            .map(|band| LegendEntry {
                label: format!("{} ({})", band.name(), band.label()),
                color: band.color(),
            })
            .collect(),
    }
}
