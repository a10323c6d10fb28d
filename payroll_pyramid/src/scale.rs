use crate::aggregate::BucketSet;
use crate::band::SalaryBand;
use crate::PyramidError;
use getset::Getters;
use serde::{Deserialize, Serialize};

/// Width (percent of one half of the chart) the largest bucket is drawn at.
pub const TARGET_MAX_WIDTH: f64 = 95.0;
/// Floor for the scale factor so sparse data still produces readable bars.
pub const MIN_SCALE_FACTOR: f64 = 45.0;

/// Parameters for mapping counts to bar widths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub target_max_width: f64,
    pub min_scale_factor: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            target_max_width: TARGET_MAX_WIDTH,
            min_scale_factor: MIN_SCALE_FACTOR,
        }
    }
}

impl ScaleConfig {
    pub fn validate(&self) -> Result<(), PyramidError> {
        if !self.target_max_width.is_finite() || self.target_max_width <= 0.0 {
            return Err(PyramidError::InvalidConfig(format!(
                "target max width must be a positive number, got {}",
                self.target_max_width
            )));
        }
        if !self.min_scale_factor.is_finite() || self.min_scale_factor <= 0.0 {
            return Err(PyramidError::InvalidConfig(format!(
                "min scale factor must be a positive number, got {}",
                self.min_scale_factor
            )));
        }
        if self.min_scale_factor > self.target_max_width {
            return Err(PyramidError::InvalidConfig(format!(
                "min scale factor {} exceeds target max width {}",
                self.min_scale_factor, self.target_max_width
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct BandMaximum {
    band: SalaryBand,
    max_count: u32,
}

/// Scale derived from one aggregation. Shared by both sides of the chart.
#[derive(Debug, Clone, PartialEq, Getters, Serialize)]
#[getset(get = "pub")]
pub struct ScaleContext {
    global_max: u32,
    scale_factor: f64,
    target_max_width: f64,
    /// Largest bucket per salary band; empty unless buckets carry bands.
    band_maxima: Vec<BandMaximum>,
}

impl ScaleContext {
    /// Bar width in percent: `count / global_max * scale_factor`,
    /// clamped to `[0, target_max_width]`.
    pub fn bar_width(&self, count: u32) -> f64 {
        if self.global_max == 0 {
            return 0.0;
        }
        let width = count as f64 / self.global_max as f64 * self.scale_factor;
        width.clamp(0.0, self.target_max_width)
    }
}

/// Derives the scale from the largest bucket on either side.
pub fn compute_scale(buckets: &BucketSet, config: &ScaleConfig) -> ScaleContext {
    let global_max = buckets.max_count();
    let scale_factor = if global_max == 0 {
        config.min_scale_factor
    } else {
        (config.target_max_width / global_max as f64).max(config.min_scale_factor)
    };

    let band_maxima = SalaryBand::ALL
        .iter()
        .filter(|&&band| buckets.iter().any(|(k, _)| k.band == Some(band)))
        .map(|&band| BandMaximum {
            band,
            max_count: buckets.max_count_for_band(band),
        })
        .collect();

    ScaleContext {
        global_max,
        scale_factor,
        target_max_width: config.target_max_width,
        band_maxima,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::BucketKey;
    use crate::curp::Gender;

    fn buckets(counts: &[(i32, Gender, u32)]) -> BucketSet {
        let mut set = BucketSet::new();
        for &(age, gender, n) in counts {
            for _ in 0..n {
                set.increment(BucketKey {
                    age,
                    gender,
                    band: None,
                });
            }
        }
        set
    }

    #[test]
    fn test_scale_factor_floor() {
        let ctx = compute_scale(&buckets(&[(30, Gender::Male, 10)]), &ScaleConfig::default());
        assert_eq!(*ctx.global_max(), 10);
        assert_eq!(*ctx.scale_factor(), 45.0);

        let ctx = compute_scale(&buckets(&[(30, Gender::Male, 1)]), &ScaleConfig::default());
        assert_eq!(*ctx.scale_factor(), 95.0);
        assert_eq!(ctx.bar_width(1), 95.0);
    }

    #[test]
    fn test_width_is_monotonic_in_count() {
        let set = buckets(&[(30, Gender::Male, 7), (31, Gender::Female, 3)]);
        let ctx = compute_scale(&set, &ScaleConfig::default());
        let widths: Vec<f64> = (0..=7).map(|c| ctx.bar_width(c)).collect();
        assert!(widths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(widths[0], 0.0);
    }

    #[test]
    fn test_width_never_exceeds_target() {
        let set = buckets(&[(30, Gender::Male, 1), (40, Gender::Female, 1)]);
        let ctx = compute_scale(&set, &ScaleConfig::default());
        for (_, count) in set.iter() {
            let w = ctx.bar_width(count);
            assert!((0.0..=TARGET_MAX_WIDTH).contains(&w));
        }
        assert!(ctx.bar_width(u32::MAX) <= TARGET_MAX_WIDTH);
    }

    #[test]
    fn test_empty_buckets_are_safe() {
        let ctx = compute_scale(&BucketSet::new(), &ScaleConfig::default());
        assert_eq!(*ctx.global_max(), 0);
        assert_eq!(*ctx.scale_factor(), MIN_SCALE_FACTOR);
        assert_eq!(ctx.bar_width(0), 0.0);
        assert!(ctx.bar_width(5).is_finite());
    }

    #[test]
    fn test_band_maxima_only_for_present_bands() {
        let mut set = BucketSet::new();
        for _ in 0..3 {
            set.increment(BucketKey {
                age: 30,
                gender: Gender::Male,
                band: Some(SalaryBand::Middle),
            });
        }
        set.increment(BucketKey {
            age: 31,
            gender: Gender::Female,
            band: Some(SalaryBand::Low),
        });
        let ctx = compute_scale(&set, &ScaleConfig::default());
        let maxima: Vec<(SalaryBand, u32)> = ctx
            .band_maxima()
            .iter()
            .map(|m| (*m.band(), *m.max_count()))
            .collect();
        assert_eq!(maxima, vec![(SalaryBand::Low, 1), (SalaryBand::Middle, 3)]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ScaleConfig::default().validate().is_ok());
        let bad = [
            ScaleConfig { target_max_width: 0.0, ..Default::default() },
            ScaleConfig { target_max_width: f64::NAN, ..Default::default() },
            ScaleConfig { min_scale_factor: -1.0, ..Default::default() },
            ScaleConfig { target_max_width: 40.0, min_scale_factor: 45.0 },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }
}
