//! Demographic fields encoded in a CURP-style national identifier.
//!
//! Layout of the characters this module reads (0-based):
//!
//! ```text
//! AAAA 95 06 15 H ...
//! 0..4 4..6 6..8 8..10 10
//!      yy   mm   dd   gender
//! ```

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum length for an identifier to yield both age and gender.
pub const MIN_IDENTITY_LEN: usize = 12;
/// Minimum length for gender-only extraction.
pub const MIN_GENDER_LEN: usize = 11;
/// Two-digit years at or below this value are read as 20xx, the rest as 19xx.
pub const CENTURY_PIVOT: u32 = 24;

const GENDER_INDEX: usize = 10;

/// Sex marker carried by the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// `H` (hombre) is male, `M` (mujer) is female, anything else is unknown.
    pub fn from_marker(marker: char) -> Self {
        match marker.to_ascii_uppercase() {
            'H' => Gender::Male,
            'M' => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Birth date as encoded in the identifier. Day-of-month is only checked
/// against 1..=31, so this is not necessarily a real calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Age and gender decoded from a valid identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedIdentity {
    pub age: i32,
    pub gender: Gender,
    pub birth_date: BirthDate,
}

/// Canonical form used for comparison and parsing.
pub fn canonical_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Decodes age (as of today, local clock) and gender.
///
/// Returns `None` for anything shorter than [`MIN_IDENTITY_LEN`] or with an
/// unreadable birth date. Never panics.
pub fn parse_identity(id: &str) -> Option<ParsedIdentity> {
    parse_identity_at(id, Local::now().date_naive())
}

/// Same as [`parse_identity`] with an explicit reference date.
pub fn parse_identity_at(id: &str, today: NaiveDate) -> Option<ParsedIdentity> {
    let clean = canonical_id(id);
    if clean.chars().count() < MIN_IDENTITY_LEN {
        return None;
    }

    let yy = two_digits(clean.get(4..6)?)?;
    let month = two_digits(clean.get(6..8)?)?;
    let day = two_digits(clean.get(8..10)?)?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }

    let year = if yy <= CENTURY_PIVOT {
        2000 + yy as i32
    } else {
        1900 + yy as i32
    };

    let mut age = today.year() - year;
    if (today.month(), today.day()) < (month, day) {
        age -= 1;
    }

    let gender = clean
        .chars()
        .nth(GENDER_INDEX)
        .map(Gender::from_marker)
        .unwrap_or(Gender::Unknown);

    Some(ParsedIdentity {
        age,
        gender,
        birth_date: BirthDate { year, month, day },
    })
}

/// Gender-only variant; does not look at the birth date.
pub fn parse_gender(id: &str) -> Gender {
    let clean = canonical_id(id);
    if clean.chars().count() < MIN_GENDER_LEN {
        return Gender::Unknown;
    }
    clean
        .chars()
        .nth(GENDER_INDEX)
        .map(Gender::from_marker)
        .unwrap_or(Gender::Unknown)
}

fn two_digits(s: &str) -> Option<u32> {
    if s.len() != 2 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
