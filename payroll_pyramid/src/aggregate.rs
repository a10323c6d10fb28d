use crate::band::SalaryBand;
use crate::curp::{parse_identity_at, Gender};
use crate::dedup::UniquePerson;
use chrono::{Local, NaiveDate};
use getset::Getters;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Which attributes a bucket is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimensions {
    AgeGender,
    AgeGenderBand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BucketKey {
    pub age: i32,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<SalaryBand>,
}

/// Person counts keyed by (age, gender, optional band).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSet {
    counts: BTreeMap<BucketKey, u32>,
}

#[derive(Serialize)]
struct BucketEntry {
    #[serde(flatten)]
    key: BucketKey,
    count: u32,
}

impl Serialize for BucketSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(
            self.counts
                .iter()
                .map(|(key, &count)| BucketEntry { key: *key, count }),
        )
    }
}

impl BucketSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, key: BucketKey) {
        *self.counts.entry(key).or_insert(0) += 1;
    }

    pub fn get(&self, key: &BucketKey) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn count_at(&self, age: i32, gender: Gender, band: Option<SalaryBand>) -> u32 {
        self.get(&BucketKey { age, gender, band })
    }

    /// Sum over every bucket of one gender at one age.
    pub fn age_total(&self, age: i32, gender: Gender) -> u32 {
        self.iter()
            .filter(|(k, _)| k.age == age && k.gender == gender)
            .map(|(_, c)| c)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BucketKey, u32)> + '_ {
        self.counts.iter().map(|(k, &c)| (k, c))
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.values().all(|&c| c == 0)
    }

    /// Buckets whose age lies in `[min_age, max_age]`.
    pub fn within_ages(&self, min_age: i32, max_age: i32) -> BucketSet {
        BucketSet {
            counts: self
                .counts
                .iter()
                .filter(|(key, _)| (min_age..=max_age).contains(&key.age))
                .map(|(key, &count)| (*key, count))
                .collect(),
        }
    }

    /// Largest single bucket, 0 when there are none.
    pub fn max_count(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    pub fn max_count_for_band(&self, band: SalaryBand) -> u32 {
        self.iter()
            .filter(|(k, _)| k.band == Some(band))
            .map(|(_, c)| c)
            .max()
            .unwrap_or(0)
    }

    pub fn total_for(&self, gender: Gender) -> u32 {
        self.iter()
            .filter(|(k, _)| k.gender == gender)
            .map(|(_, c)| c)
            .sum()
    }
}

/// Where each person ended up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct AggregationDiagnostics {
    persons: usize,
    /// Persons whose ID did not yield an age.
    invalid_identity: usize,
    /// Persons with a valid date but no usable gender marker.
    unknown_gender: usize,
    bucketed: usize,
}

#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct BandStats {
    band: SalaryBand,
    male: usize,
    female: usize,
    total: usize,
}

/// Headline numbers shown alongside the chart.
#[derive(Debug, Clone, Default, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct PyramidStats {
    male: usize,
    female: usize,
    male_percentage: f64,
    female_percentage: f64,
    /// Mean age over every person with a valid identity.
    average_age: f64,
    /// Mean monetary total over every person with a valid identity.
    average_amount: f64,
    /// Per-band split; only filled for [`Dimensions::AgeGenderBand`].
    bands: Vec<BandStats>,
}

#[derive(Debug, Clone, Getters, Serialize)]
#[getset(get = "pub")]
pub struct Aggregation {
    dimensions: Dimensions,
    buckets: BucketSet,
    diagnostics: AggregationDiagnostics,
    stats: PyramidStats,
}

/// Buckets unique persons, computing ages against the local date.
pub fn aggregate(people: &[UniquePerson], dimensions: Dimensions) -> Aggregation {
    aggregate_at(people, dimensions, Local::now().date_naive())
}

/// Buckets unique persons by age and gender (and salary band when requested).
///
/// Each person adds exactly 1 to one bucket. Persons whose ID does not parse
/// and persons with an unknown gender are counted in the diagnostics only.
pub fn aggregate_at(
    people: &[UniquePerson],
    dimensions: Dimensions,
    today: NaiveDate,
) -> Aggregation {
    let mut buckets = BucketSet::new();
    let mut diagnostics = AggregationDiagnostics {
        persons: people.len(),
        ..Default::default()
    };
    let mut band_counts: BTreeMap<SalaryBand, (usize, usize)> = BTreeMap::new();
    let (mut male, mut female) = (0usize, 0usize);
    let (mut valid, mut age_sum, mut amount_sum) = (0usize, 0i64, 0.0f64);

    for person in people {
        let Some(identity) = parse_identity_at(person.id(), today) else {
            diagnostics.invalid_identity += 1;
            continue;
        };

        match identity.gender {
            Gender::Male => male += 1,
            Gender::Female => female += 1,
            Gender::Unknown => {
                diagnostics.unknown_gender += 1;
                continue;
            }
        }

        valid += 1;
        age_sum += identity.age as i64;
        amount_sum += *person.total_amount();

        let band = match dimensions {
            Dimensions::AgeGender => None,
            Dimensions::AgeGenderBand => Some(SalaryBand::for_amount(*person.total_amount())),
        };
        if let Some(band) = band {
            let entry = band_counts.entry(band).or_insert((0, 0));
            if identity.gender == Gender::Male {
                entry.0 += 1;
            } else {
                entry.1 += 1;
            }
        }

        buckets.increment(BucketKey {
            age: identity.age,
            gender: identity.gender,
            band,
        });
        diagnostics.bucketed += 1;
    }

    if diagnostics.invalid_identity > 0 {
        warn!(
            invalid = diagnostics.invalid_identity,
            persons = diagnostics.persons,
            "persons excluded from pyramid: unreadable national ID"
        );
    }

    let sided = male + female;
    let percentage = |n: usize| {
        if sided > 0 {
            n as f64 / sided as f64 * 100.0
        } else {
            0.0
        }
    };
    let bands = match dimensions {
        Dimensions::AgeGender => Vec::new(),
        Dimensions::AgeGenderBand => SalaryBand::ALL
            .iter()
            .map(|&band| {
                let (m, f) = band_counts.get(&band).copied().unwrap_or((0, 0));
                BandStats {
                    band,
                    male: m,
                    female: f,
                    total: m + f,
                }
            })
            .collect(),
    };

    let stats = PyramidStats {
        male,
        female,
        male_percentage: percentage(male),
        female_percentage: percentage(female),
        average_age: if valid > 0 {
            age_sum as f64 / valid as f64
        } else {
            0.0
        },
        average_amount: if valid > 0 {
            amount_sum / valid as f64
        } else {
            0.0
        },
        bands,
    };

    debug!(
        bucketed = diagnostics.bucketed,
        buckets = buckets.len(),
        male,
        female,
        unknown_gender = diagnostics.unknown_gender,
        "aggregated persons into buckets"
    );

    Aggregation {
        dimensions,
        buckets,
        diagnostics,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::deduplicate;
    use crate::record::{normalize_all, PayrollRecord};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn people(rows: &[(&str, f64)]) -> Vec<UniquePerson> {
        let records: Vec<PayrollRecord> = rows
            .iter()
            .map(|(curp, cost)| PayrollRecord::new().with("curp", *curp).with("costoNomina", *cost))
            .collect();
        deduplicate(&normalize_all(&records)).into_persons()
    }

    #[test]
    fn test_one_count_per_person() {
        let p = people(&[
            ("AAAA950615HAAAAA01", 1000.0),
            ("AAAA950615HAAAAA01", 1500.0),
            ("AAAA950615HAAAAA01", 2000.0),
        ]);
        let agg = aggregate_at(&p, Dimensions::AgeGender, today());
        assert_eq!(agg.buckets().count_at(31, Gender::Male, None), 1);
        assert_eq!(agg.buckets().total_for(Gender::Male), 1);
        assert_eq!(*agg.diagnostics().bucketed(), 1);
    }

    #[test]
    fn test_per_gender_sums_match_valid_persons() {
        let p = people(&[
            ("AAAA950615HAAAAA01", 1.0),
            ("BBBB880220MBBBBB02", 1.0),
            ("CCCC880220MCCCCC03", 1.0),
            ("XYZ", 1.0),
            ("DDDD990101XDDDDD04", 1.0),
        ]);
        let agg = aggregate_at(&p, Dimensions::AgeGender, today());
        assert_eq!(agg.buckets().total_for(Gender::Male), 1);
        assert_eq!(agg.buckets().total_for(Gender::Female), 2);
        assert_eq!(agg.buckets().count_at(38, Gender::Female, None), 2);
        assert_eq!(*agg.diagnostics().invalid_identity(), 1);
        assert_eq!(*agg.diagnostics().unknown_gender(), 1);
        assert_eq!(*agg.stats().male(), 1);
        assert_eq!(*agg.stats().female(), 2);
    }

    #[test]
    fn test_salary_bands_from_person_total() {
        let p = people(&[
            ("AAAA950615HAAAAA01", 6000.0),
            ("AAAA950615HAAAAA01", 6000.0),
            ("BBBB880220MBBBBB02", 60_000.0),
        ]);
        let agg = aggregate_at(&p, Dimensions::AgeGenderBand, today());
        assert_eq!(
            agg.buckets()
                .count_at(31, Gender::Male, Some(SalaryBand::LowerMiddle)),
            1
        );
        assert_eq!(agg.buckets().count_at(31, Gender::Male, Some(SalaryBand::Low)), 0);
        assert_eq!(agg.buckets().count_at(38, Gender::Female, Some(SalaryBand::High)), 1);
        assert_eq!(agg.buckets().age_total(31, Gender::Male), 1);

        let bands = agg.stats().bands();
        assert_eq!(bands.len(), 5);
        let high = bands.iter().find(|b| *b.band() == SalaryBand::High).unwrap();
        assert_eq!((*high.male(), *high.female(), *high.total()), (0, 1, 1));
    }

    #[test]
    fn test_stats_averages_and_percentages() {
        let p = people(&[("AAAA950615HAAAAA01", 1000.0), ("BBBB880220MBBBBB02", 3000.0)]);
        let agg = aggregate_at(&p, Dimensions::AgeGender, today());
        let stats = agg.stats();
        assert_eq!(*stats.male_percentage(), 50.0);
        assert_eq!(*stats.female_percentage(), 50.0);
        assert_eq!(*stats.average_age(), 34.5);
        assert_eq!(*stats.average_amount(), 2000.0);
        assert!(stats.bands().is_empty());
    }

    #[test]
    fn test_averages_skip_unknown_gender() {
        let p = people(&[("AAAA950615HAAAAA01", 1000.0), ("ZZZZ500101XZZZZZ09", 9000.0)]);
        let agg = aggregate_at(&p, Dimensions::AgeGender, today());
        assert_eq!(*agg.diagnostics().bucketed(), 1);
        assert_eq!(*agg.diagnostics().unknown_gender(), 1);
        assert_eq!(*agg.stats().average_age(), 31.0);
        assert_eq!(*agg.stats().average_amount(), 1000.0);
    }

    #[test]
    fn test_within_ages_drops_outside_buckets() {
        let p = people(&[
            ("AAAA950615HAAAAA01", 1.0),
            ("BBBB160101HBBBBB02", 1.0),
            ("CCCC160101HCCCCC03", 1.0),
        ]);
        let agg = aggregate_at(&p, Dimensions::AgeGender, today());
        assert_eq!(agg.buckets().max_count(), 2);
        let visible = agg.buckets().within_ages(15, 80);
        assert_eq!(visible.max_count(), 1);
        assert_eq!(visible.count_at(10, Gender::Male, None), 0);
        assert_eq!(visible.count_at(31, Gender::Male, None), 1);
    }

    #[test]
    fn test_empty_population() {
        let agg = aggregate_at(&[], Dimensions::AgeGender, today());
        assert!(agg.buckets().is_empty());
        assert_eq!(agg.buckets().max_count(), 0);
        assert_eq!(*agg.stats().average_age(), 0.0);
    }
}
