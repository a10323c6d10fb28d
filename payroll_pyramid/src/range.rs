use crate::aggregate::BucketSet;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_AGE: i32 = 15;
pub const DEFAULT_MAX_AGE: i32 = 80;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowOrder {
    Ascending,
    /// Oldest row first, the usual pyramid orientation.
    #[default]
    Descending,
}

/// Ages to render: every integer between the youngest and oldest populated
/// age inside `[min_age, max_age]`, interior gaps included.
///
/// Empty when no bucket in range has a non-zero count.
pub fn compact_range(buckets: &BucketSet, min_age: i32, max_age: i32, order: RowOrder) -> Vec<i32> {
    let populated = buckets
        .iter()
        .filter(|(key, count)| *count > 0 && (min_age..=max_age).contains(&key.age))
        .map(|(key, _)| key.age);

    let (low, high) = populated.fold((None, None), |(lo, hi): (Option<i32>, Option<i32>), age| {
        (
            Some(lo.map_or(age, |l| l.min(age))),
            Some(hi.map_or(age, |h| h.max(age))),
        )
    });

    let (Some(low), Some(high)) = (low, high) else {
        return Vec::new();
    };

    match order {
        RowOrder::Ascending => (low..=high).collect(),
        RowOrder::Descending => (low..=high).rev().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::BucketKey;
    use crate::curp::Gender;

    fn set(ages: &[(i32, Gender)]) -> BucketSet {
        let mut set = BucketSet::new();
        for &(age, gender) in ages {
            set.increment(BucketKey {
                age,
                gender,
                band: None,
            });
        }
        set
    }

    #[test]
    fn test_contiguous_including_gaps() {
        let buckets = set(&[(20, Gender::Male), (23, Gender::Female)]);
        assert_eq!(
            compact_range(&buckets, 15, 80, RowOrder::Ascending),
            vec![20, 21, 22, 23]
        );
        assert_eq!(
            compact_range(&buckets, 15, 80, RowOrder::Descending),
            vec![23, 22, 21, 20]
        );
    }

    #[test]
    fn test_out_of_bounds_ages_are_ignored() {
        let buckets = set(&[(10, Gender::Male), (30, Gender::Female), (95, Gender::Male)]);
        assert_eq!(
            compact_range(&buckets, DEFAULT_MIN_AGE, DEFAULT_MAX_AGE, RowOrder::Ascending),
            vec![30]
        );
    }

    #[test]
    fn test_empty_when_nothing_in_range() {
        assert!(compact_range(&BucketSet::new(), 15, 80, RowOrder::Descending).is_empty());
        let buckets = set(&[(5, Gender::Male)]);
        assert!(compact_range(&buckets, 15, 80, RowOrder::Descending).is_empty());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let buckets = set(&[(15, Gender::Male), (80, Gender::Female)]);
        let rows = compact_range(&buckets, 15, 80, RowOrder::Ascending);
        assert_eq!(rows.first(), Some(&15));
        assert_eq!(rows.last(), Some(&80));
        assert_eq!(rows.len(), 66);
    }
}
