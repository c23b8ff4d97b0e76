//! Long-format score table

use super::{Coding, Metric, ScoreRecord};
use crate::taxonomy::sort_class_labels;
use serde::{Deserialize, Serialize};

/// Absolute tolerance for alpha matching (numpy `isclose` defaults)
const ALPHA_ATOL: f64 = 1e-8;
/// Relative tolerance for alpha matching (numpy `isclose` defaults)
const ALPHA_RTOL: f64 = 1e-5;

/// Approximate float equality with numpy `isclose` semantics.
///
/// Alpha values are caller-supplied grid points that may have been
/// re-parsed through text formats, so exact equality is too strict.
#[must_use]
pub(crate) fn alpha_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= ALPHA_RTOL.mul_add(b.abs(), ALPHA_ATOL)
}

/// Long-format score table: one row per (sample, class, coding, alpha).
///
/// Owns its records; every transformation produces a new table or mutates
/// this one in place, never sharing rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ScoreTable {
    records: Vec<ScoreRecord>,
}

impl ScoreTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Create a table from existing records.
    #[must_use]
    pub fn from_records(records: Vec<ScoreRecord>) -> Self {
        Self { records }
    }

    /// Append a record.
    pub fn push(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    /// Append all records from an iterator.
    pub fn extend(&mut self, records: impl IntoIterator<Item = ScoreRecord>) {
        self.records.extend(records);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrow all records.
    #[must_use]
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Mutably borrow all records.
    pub fn records_mut(&mut self) -> &mut [ScoreRecord] {
        &mut self.records
    }

    /// Unique class labels in canonical order (see [`crate::taxonomy`]).
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        let labels: Vec<String> = self.records.iter().map(|r| r.class().to_string()).collect();
        sort_class_labels(&labels)
    }

    /// Unique alpha values, ascending.
    ///
    /// Values within `isclose` tolerance of an already-seen alpha are folded
    /// into that representative.
    #[must_use]
    pub fn alphas(&self) -> Vec<f64> {
        let mut unique: Vec<f64> = Vec::new();
        for record in &self.records {
            if !unique.iter().any(|&a| alpha_close(record.alpha(), a)) {
                unique.push(record.alpha());
            }
        }
        unique.sort_by(f64::total_cmp);
        unique
    }

    /// Restrict to rows whose alpha approximately matches any grid value.
    ///
    /// This is the `include_subset` operation: rows are emitted grouped by
    /// grid value, in grid order, preserving row order within each group.
    #[must_use]
    pub fn filter_alpha(&self, include_alpha: &[f64]) -> Self {
        let mut records = Vec::new();
        for &alpha in include_alpha {
            records.extend(
                self.records
                    .iter()
                    .filter(|r| alpha_close(r.alpha(), alpha))
                    .cloned(),
            );
        }
        Self { records }
    }

    /// Restrict to rows of one coding direction.
    #[must_use]
    pub fn filter_coding(&self, coding: Coding) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.coding() == coding)
                .cloned()
                .collect(),
        }
    }

    /// Restrict to rows of one class.
    #[must_use]
    pub fn filter_class(&self, class: &str) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|r| r.class() == class)
                .cloned()
                .collect(),
        }
    }

    /// Extract the observed (non-missing) values of a metric column.
    #[must_use]
    pub fn metric_values(&self, metric: Metric) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.metric(metric))
            .collect()
    }

    /// Extract the covariate column (one value per row).
    #[must_use]
    pub fn n_nodes_values(&self) -> Vec<f64> {
        self.records.iter().map(ScoreRecord::n_nodes).collect()
    }
}

impl IntoIterator for ScoreTable {
    type Item = ScoreRecord;
    type IntoIter = std::vec::IntoIter<ScoreRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<ScoreRecord> for ScoreTable {
    fn from_iter<I: IntoIterator<Item = ScoreRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
