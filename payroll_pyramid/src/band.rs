use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed monetary ranges over a person's aggregated payroll total.
///
/// Ranges are half-open and contiguous: `[0, 10k)`, `[10k, 20k)`,
/// `[20k, 35k)`, `[35k, 50k)`, `[50k, ∞)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryBand {
    Low,
    LowerMiddle,
    Middle,
    UpperMiddle,
    High,
}

impl SalaryBand {
    /// All bands in ascending order.
    pub const ALL: [SalaryBand; 5] = [
        SalaryBand::Low,
        SalaryBand::LowerMiddle,
        SalaryBand::Middle,
        SalaryBand::UpperMiddle,
        SalaryBand::High,
    ];

    /// Lower (inclusive) and upper (exclusive) bound.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            SalaryBand::Low => (0.0, 10_000.0),
            SalaryBand::LowerMiddle => (10_000.0, 20_000.0),
            SalaryBand::Middle => (20_000.0, 35_000.0),
            SalaryBand::UpperMiddle => (35_000.0, 50_000.0),
            SalaryBand::High => (50_000.0, f64::INFINITY),
        }
    }

    pub fn contains(&self, amount: f64) -> bool {
        let (min, max) = self.bounds();
        amount >= min && amount < max
    }

    /// First matching band; negative or NaN totals fall into [`SalaryBand::Low`].
    pub fn for_amount(amount: f64) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|band| band.contains(amount))
            .unwrap_or(SalaryBand::Low)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SalaryBand::Low => "< $10K",
            SalaryBand::LowerMiddle => "$10K - $20K",
            SalaryBand::Middle => "$20K - $35K",
            SalaryBand::UpperMiddle => "$35K - $50K",
            SalaryBand::High => "> $50K",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SalaryBand::Low => "Low",
            SalaryBand::LowerMiddle => "Lower-Middle",
            SalaryBand::Middle => "Middle",
            SalaryBand::UpperMiddle => "Upper-Middle",
            SalaryBand::High => "High",
        }
    }

    /// CSS gradient used for this band's bars and legend swatch.
    pub fn color(&self) -> &'static str {
        match self {
            SalaryBand::Low => "linear-gradient(90deg, #2E8B57, #3CB371)",
            SalaryBand::LowerMiddle => "linear-gradient(90deg, #1e3a8a, #3b82f6)",
            SalaryBand::Middle => "linear-gradient(90deg, #FFD700, #FFA500)",
            SalaryBand::UpperMiddle => "linear-gradient(90deg, #FF6347, #DC143C)",
            SalaryBand::High => "linear-gradient(90deg, #8B008B, #4B0082)",
        }
    }
}

impl fmt::Display for SalaryBand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        assert_eq!(SalaryBand::for_amount(0.0), SalaryBand::Low);
        assert_eq!(SalaryBand::for_amount(9_999.99), SalaryBand::Low);
        assert_eq!(SalaryBand::for_amount(10_000.0), SalaryBand::LowerMiddle);
        assert_eq!(SalaryBand::for_amount(20_000.0), SalaryBand::Middle);
        assert_eq!(SalaryBand::for_amount(34_999.0), SalaryBand::Middle);
        assert_eq!(SalaryBand::for_amount(35_000.0), SalaryBand::UpperMiddle);
        assert_eq!(SalaryBand::for_amount(50_000.0), SalaryBand::High);
        assert_eq!(SalaryBand::for_amount(1e12), SalaryBand::High);
    }

    #[test]
    fn test_invalid_amounts_default_to_lowest() {
        assert_eq!(SalaryBand::for_amount(-1.0), SalaryBand::Low);
        assert_eq!(SalaryBand::for_amount(f64::NAN), SalaryBand::Low);
    }

    #[test]
    fn test_exactly_one_band_matches() {
        for amount in [0.0, 5_000.0, 10_000.0, 19_999.0, 27_500.0, 49_999.99, 80_000.0] {
            let hits = SalaryBand::ALL.iter().filter(|b| b.contains(amount)).count();
            assert_eq!(hits, 1, "amount {amount}");
        }
    }
}
