use chrono::{Datelike, Local, NaiveDate};
use payroll_pyramid::{
    aggregate_at, compact_range, compute_scale, deduplicate, normalize_all, parse_identity,
    Dimensions, Gender, PayrollRecord, PyramidBuilder, PyramidVariant, RowOrder, SalaryBand,
    ScaleConfig,
};

fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn row(curp: &str, cost: f64, period: &str) -> PayrollRecord {
    PayrollRecord::new()
        .with("curp", curp)
        .with("costoNomina", cost)
        .with("periodo", period)
}

#[test]
fn test_identity_against_local_clock() {
    let parsed = parse_identity("AAAA950615HAAAAA01").unwrap();
    let today = Local::now().date_naive();
    let mut expected = today.year() - 1995;
    if (today.month(), today.day()) < (6, 15) {
        expected -= 1;
    }
    assert_eq!(parsed.age, expected);
    assert_eq!(parsed.gender, Gender::Male);
}

#[test]
fn test_same_person_three_periods() {
    let records = vec![
        row("AAAA950615HAAAAA01", 1000.0, "2024-08-15"),
        row("AAAA950615HAAAAA01", 1500.0, "2024-09-15"),
        row("AAAA950615HAAAAA01", 2000.0, "2024-10-15"),
    ];
    let dedup = deduplicate(&normalize_all(&records));
    assert_eq!(dedup.unique_count(), 1);
    let person = &dedup.persons()[0];
    assert_eq!(*person.total_amount(), 4500.0);

    let agg = aggregate_at(dedup.persons(), Dimensions::AgeGenderBand, reference());
    assert_eq!(
        agg.buckets().count_at(31, Gender::Male, Some(SalaryBand::Low)),
        1
    );
    assert_eq!(agg.buckets().total_for(Gender::Male), 1);
}

#[test]
fn test_two_people_same_age_different_bands() {
    let records = vec![
        row("EEEE960101HEEEEE05", 12_000.0, "2024-10-15"),
        row("FFFF960301MFFFFF06", 9_000.0, "2024-10-15"),
    ];
    let dedup = deduplicate(&normalize_all(&records));
    let agg = aggregate_at(dedup.persons(), Dimensions::AgeGenderBand, reference());

    assert_eq!(
        agg.buckets()
            .count_at(30, Gender::Male, Some(SalaryBand::LowerMiddle)),
        1
    );
    assert_eq!(
        agg.buckets().count_at(30, Gender::Female, Some(SalaryBand::Low)),
        1
    );

    let scale = compute_scale(agg.buckets(), &ScaleConfig::default());
    assert_eq!(*scale.global_max(), 1);
    assert_eq!(*scale.scale_factor(), 95.0);
    assert_eq!(scale.bar_width(1), 95.0);
}

#[test]
fn test_every_row_is_accounted_for() {
    let records = vec![
        row("AAAA950615HAAAAA01", 1.0, "2024-10-15"),
        row("AAAA950615HAAAAA01", 1.0, "2024-10-15"),
        row("", 1.0, "2024-10-15"),
        PayrollRecord::new().with("nombre", "sin id"),
        row("BBBB880220MBBBBB02", 1.0, "2024-10-15"),
    ];
    let dedup = deduplicate(&normalize_all(&records));
    assert!(dedup.is_conserved());
    assert_eq!(dedup.unique_count(), 2);
    assert_eq!(*dedup.invalid_id_count(), 2);
}

#[test]
fn test_bucket_sums_match_gendered_persons() {
    let records = vec![
        row("AAAA950615HAAAAA01", 1.0, "p"),
        row("BBBB880220MBBBBB02", 1.0, "p"),
        row("CCCC010101HCCCCC03", 1.0, "p"),
        row("DDDD990101XDDDDD04", 1.0, "p"),
        row("SHORT", 1.0, "p"),
    ];
    let dedup = deduplicate(&normalize_all(&records));
    for dims in [Dimensions::AgeGender, Dimensions::AgeGenderBand] {
        let agg = aggregate_at(dedup.persons(), dims, reference());
        assert_eq!(agg.buckets().total_for(Gender::Male), 2);
        assert_eq!(agg.buckets().total_for(Gender::Female), 1);
        assert_eq!(agg.buckets().total_for(Gender::Unknown), 0);
    }
}

#[test]
fn test_larger_bucket_never_draws_narrower() {
    let mut records = Vec::new();
    for _ in 0..5 {
        records.push(row("AAAA950615HAAAAA01", 1.0, "p"));
    }
    let ids = ["GGGG900101HGGGGG01", "HHHH900101HHHHHH02", "IIII900101HIIIII03"];
    for id in ids {
        records.push(row(id, 1.0, "p"));
    }
    records.push(row("JJJJ800101MJJJJJ04", 1.0, "p"));

    let dedup = deduplicate(&normalize_all(&records));
    let agg = aggregate_at(dedup.persons(), Dimensions::AgeGender, reference());
    let scale = compute_scale(agg.buckets(), &ScaleConfig::default());

    let counts: Vec<u32> = agg.buckets().iter().map(|(_, c)| c).collect();
    for &a in &counts {
        for &b in &counts {
            if a > b {
                assert!(scale.bar_width(a) >= scale.bar_width(b));
            }
        }
        assert!(scale.bar_width(a) <= 95.0);
    }
}

#[test]
fn test_empty_input_is_safe_end_to_end() {
    let agg = aggregate_at(&[], Dimensions::AgeGender, reference());
    let scale = compute_scale(agg.buckets(), &ScaleConfig::default());
    assert!(scale.scale_factor().is_finite());
    assert!(compact_range(agg.buckets(), 15, 80, RowOrder::Descending).is_empty());

    let results = PyramidBuilder::new(Vec::new()).run().unwrap();
    assert!(results.view().is_empty());
}

#[test]
fn test_builder_salary_variant() -> Result<(), Box<dyn std::error::Error>> {
    let records = vec![
        row("AAAA950615HAAAAA01", 30_000.0, "2024-10-15"),
        row("BBBB880220MBBBBB02", 60_000.0, "2024-10-15"),
        row("CCCC500101HCCCCC03", 60_000.0, "2024-10-15"),
    ];
    let results = PyramidBuilder::new(records)
        .variant(PyramidVariant::SalaryAge)
        .age_bounds(18, 65)
        .order(RowOrder::Ascending)
        .reference_date(reference())
        .run()?;

    let rows = results.view().rows();
    assert_eq!(rows.first().map(|r| r.age), Some(31));
    assert_eq!(rows.last().map(|r| r.age), Some(38));
    assert_eq!(*results.unique_persons(), 3);

    let json: serde_json::Value = serde_json::from_str(&results.to_json()?)?;
    assert_eq!(json["variant"], "salary_age");
    assert_eq!(json["view"]["kind"], "chart");
    assert_eq!(json["aggregation"]["diagnostics"]["bucketed"], 3);
    Ok(())
}
