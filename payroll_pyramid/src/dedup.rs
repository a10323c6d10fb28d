use crate::record::NormalizedRecord;
use getset::Getters;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// All payroll rows that share one national ID, collapsed.
#[derive(Debug, Clone, Getters, Serialize)]
#[getset(get = "pub")]
pub struct UniquePerson {
    id: String,
    /// Sum of the monetary amount over every contributing row.
    total_amount: f64,
    record_count: usize,
    /// Most recent pay period seen for this person, if any row carried one.
    latest_period: Option<String>,
    /// Fields of the first row seen for this ID.
    #[serde(skip)]
    fields: Map<String, Value>,
}

impl UniquePerson {
    fn seed(id: String, record: &NormalizedRecord) -> Self {
        Self {
            id,
            total_amount: 0.0,
            record_count: 0,
            latest_period: None,
            fields: record.fields.clone(),
        }
    }

    fn absorb(&mut self, record: &NormalizedRecord) {
        self.total_amount += record.amount;
        self.record_count += 1;
        if let Some(period) = &record.period {
            if self.latest_period.as_ref().map_or(true, |p| period > p) {
                self.latest_period = Some(period.clone());
            }
        }
    }
}

/// Result of collapsing rows by national ID.
#[derive(Debug, Clone, Default, Getters, Serialize)]
#[getset(get = "pub")]
pub struct Deduplication {
    /// One entry per distinct ID, in first-seen order.
    persons: Vec<UniquePerson>,
    /// Rows with no usable ID.
    invalid_id_count: usize,
    total_records: usize,
    #[serde(skip)]
    #[getset(skip)]
    index: HashMap<String, usize>,
}

impl Deduplication {
    pub fn unique_count(&self) -> usize {
        self.persons.len()
    }

    pub fn get(&self, id: &str) -> Option<&UniquePerson> {
        self.index.get(id).map(|&i| &self.persons[i])
    }

    /// Every input row is accounted for either by a person or by the invalid tally.
    pub fn is_conserved(&self) -> bool {
        let attributed: usize = self.persons.iter().map(|p| p.record_count).sum();
        attributed + self.invalid_id_count == self.total_records
    }

    pub fn into_persons(self) -> Vec<UniquePerson> {
        self.persons
    }
}

/// Groups rows by canonical ID, summing amounts and counting rows per person.
pub fn deduplicate(records: &[NormalizedRecord]) -> Deduplication {
    let mut out = Deduplication {
        total_records: records.len(),
        ..Default::default()
    };

    for record in records {
        let Some(id) = record.id.as_ref() else {
            out.invalid_id_count += 1;
            continue;
        };

        let slot = match out.index.get(id) {
            Some(&i) => i,
            None => {
                out.persons.push(UniquePerson::seed(id.clone(), record));
                out.index.insert(id.clone(), out.persons.len() - 1);
                out.persons.len() - 1
            }
        };
        out.persons[slot].absorb(record);
    }

    debug!(
        total = out.total_records,
        unique = out.persons.len(),
        invalid_id = out.invalid_id_count,
        "deduplicated payroll rows"
    );

    out
}
