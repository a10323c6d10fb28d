use crate::presentation::{Bar, PyramidView};
use crate::PyramidResults;

const TEMPLATE: &str = include_str!("../templates/pyramid.html");

pub(crate) fn render(results: &PyramidResults) -> String {
    let stats = results.aggregation().stats();
    let diagnostics = results.aggregation().diagnostics();

    let (rows_html, legend_html, row_height, chart_height) = match results.view() {
        PyramidView::Empty { message } => (
            format!("<div class=\"empty\">{}</div>", escape(message)),
            String::new(),
            0.0,
            0.0,
        ),
        PyramidView::Chart {
            rows,
            layout,
            legend,
            ..
        } => {
            let mut rows_html = String::new();
            for row in rows {
                rows_html.push_str(&format!(
                    "<div class=\"row\"><div class=\"side female\">{}</div><div class=\"age\">{}</div><div class=\"side male\">{}</div></div>\n",
                    bars(&row.female, true),
                    row.age,
                    bars(&row.male, false)
                ));
            }
            let mut legend_html = String::new();
            for entry in legend {
                legend_html.push_str(&format!(
                    "<div class=\"legend-item\"><div class=\"swatch\" style=\"background: {}\"></div><span>{}</span></div>\n",
                    entry.color,
                    escape(&entry.label)
                ));
            }
            (rows_html, legend_html, layout.row_height_px, layout.chart_height_px)
        }
    };

    let diagnostics_html = format!(
        "Records read: {} &middot; rows without ID: {} &middot; unreadable IDs: {} &middot; unknown gender: {} &middot; ages as of {}",
        results.total_records(),
        results.invalid_id_count(),
        diagnostics.invalid_identity(),
        diagnostics.unknown_gender(),
        results.reference_date()
    );

    TEMPLATE
        .replace("{{ title }}", results.variant().title())
        .replace("{{ total_persons }}", &results.unique_persons().to_string())
        .replace("{{ female }}", &stats.female().to_string())
        .replace("{{ male }}", &stats.male().to_string())
        .replace(
            "{{ female_percentage }}",
            &format!("{:.1}", stats.female_percentage()),
        )
        .replace("{{ male_percentage }}", &format!("{:.1}", stats.male_percentage()))
        .replace("{{ average_age }}", &format!("{:.1}", stats.average_age()))
        .replace("{{ row_height }}", &format!("{:.2}", row_height))
        .replace("{{ chart_height }}", &format!("{:.2}", chart_height))
        .replace("<!-- legend -->", &legend_html)
        .replace("<!-- rows -->", &rows_html)
        .replace("<!-- diagnostics -->", &diagnostics_html)
}

fn bars(bars: &[Bar], reversed: bool) -> String {
    let render = |bar: &Bar| {
        format!(
            "<div class=\"bar\" style=\"width: {:.2}%; background: {}\" title=\"{}\"></div>",
            bar.width_percent,
            bar.color,
            escape(&bar.tooltip)
        )
    };
    // Female segments grow leftwards from the axis, so the lowest band sits next to it.
    if reversed {
        bars.iter().rev().map(render).collect()
    } else {
        bars.iter().map(render).collect()
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use crate::{PayrollRecord, PyramidBuilder, PyramidVariant};
    use chrono::NaiveDate;

    fn results(variant: PyramidVariant, records: Vec<PayrollRecord>) -> crate::PyramidResults {
        PyramidBuilder::new(records)
            .variant(variant)
            .reference_date(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap())
            .run()
            .unwrap()
    }

    #[test]
    fn test_html_contains_rows_and_escaped_tooltips() {
        let html = results(
            PyramidVariant::SalaryAge,
            vec![PayrollRecord::new()
                .with("curp", "AAAA950615HAAAAA01")
                .with("costoNomina", 500.0)],
        )
        .to_html();
        assert!(html.contains("<title>Salary and Age Pyramid</title>"));
        assert!(html.contains("31 years: 1 men, &lt; $10K"));
        assert!(!html.contains("{{"));
        assert!(!html.contains("<!-- rows -->"));
    }

    #[test]
    fn test_html_empty_state() {
        let html = results(PyramidVariant::Population, Vec::new()).to_html();
        assert!(html.contains("No demographic data available"));
    }
}
