//! Wide-format merged score table

use super::{Metric, ScoreRecord};
use crate::taxonomy::sort_class_labels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed column order of the wide format when exported to tabular storage
pub const MERGED_COLUMN_ORDER: [&str; 10] = [
    "sample_id",
    "class",
    "encoding performance",
    "decoding performance",
    "coding performance",
    "encoding capacity",
    "decoding capacity",
    "coding capacity",
    "n_nodes",
    "analysis",
];

/// Column family of the wide format
///
/// `Coding` is the signed difference, encoding minus decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Encoding direction scores
    Encoding,
    /// Decoding direction scores
    Decoding,
    /// Difference scores (encoding − decoding)
    Coding,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding => write!(f, "encoding"),
            Self::Decoding => write!(f, "decoding"),
            Self::Coding => write!(f, "coding"),
        }
    }
}

/// One wide-format row: paired encoding/decoding/difference scores.
///
/// Produced by [`crate::merge::merge_scores`]; by the time a row exists all
/// missingness has been imputed, so score fields are plain `f64`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MergedRecord {
    sample_id: String,
    class: String,
    alpha: f64,
    encoding_performance: f64,
    decoding_performance: f64,
    coding_performance: f64,
    encoding_capacity: f64,
    decoding_capacity: f64,
    coding_capacity: f64,
    n_nodes: f64,
    analysis: String,
}

impl MergedRecord {
    /// Build a wide row from a matched encoding/decoding pair.
    ///
    /// Score values must already be imputed. The difference columns are
    /// derived here, never stored independently at construction.
    #[must_use]
    pub fn from_pair(
        encoding: &ScoreRecord,
        decoding: &ScoreRecord,
        encoding_scores: (f64, f64),
        decoding_scores: (f64, f64),
    ) -> Self {
        let (encoding_performance, encoding_capacity) = encoding_scores;
        let (decoding_performance, decoding_capacity) = decoding_scores;
        Self {
            sample_id: encoding.sample_id().to_string(),
            class: encoding.class().to_string(),
            alpha: encoding.alpha(),
            encoding_performance,
            decoding_performance,
            coding_performance: encoding_performance - decoding_performance,
            encoding_capacity,
            decoding_capacity,
            coding_capacity: encoding_capacity - decoding_capacity,
            n_nodes: encoding.n_nodes(),
            analysis: decoding.analysis().to_string(),
        }
    }

    /// Get the sample identifier.
    #[must_use]
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Get the class label.
    #[must_use]
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Get the control parameter value.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Get the node-count covariate.
    #[must_use]
    pub const fn n_nodes(&self) -> f64 {
        self.n_nodes
    }

    /// Get the analysis regime tag.
    #[must_use]
    pub fn analysis(&self) -> &str {
        &self.analysis
    }

    /// Get a wide-format score cell.
    #[must_use]
    pub const fn value(&self, channel: Channel, metric: Metric) -> f64 {
        match (channel, metric) {
            (Channel::Encoding, Metric::Performance) => self.encoding_performance,
            (Channel::Decoding, Metric::Performance) => self.decoding_performance,
            (Channel::Coding, Metric::Performance) => self.coding_performance,
            (Channel::Encoding, Metric::Capacity) => self.encoding_capacity,
            (Channel::Decoding, Metric::Capacity) => self.decoding_capacity,
            (Channel::Coding, Metric::Capacity) => self.coding_capacity,
        }
    }

    /// Replace a wide-format score cell.
    ///
    /// Writing an encoding or decoding cell does NOT refresh the derived
    /// difference column; call [`Self::recompute_coding`] after batch edits.
    pub fn set_value(&mut self, channel: Channel, metric: Metric, value: f64) {
        match (channel, metric) {
            (Channel::Encoding, Metric::Performance) => self.encoding_performance = value,
            (Channel::Decoding, Metric::Performance) => self.decoding_performance = value,
            (Channel::Coding, Metric::Performance) => self.coding_performance = value,
            (Channel::Encoding, Metric::Capacity) => self.encoding_capacity = value,
            (Channel::Decoding, Metric::Capacity) => self.decoding_capacity = value,
            (Channel::Coding, Metric::Capacity) => self.coding_capacity = value,
        }
    }

    /// Refresh the difference column of one metric from its direction cells.
    pub fn recompute_coding(&mut self, metric: Metric) {
        match metric {
            Metric::Performance => {
                self.coding_performance = self.encoding_performance - self.decoding_performance;
            }
            Metric::Capacity => {
                self.coding_capacity = self.encoding_capacity - self.decoding_capacity;
            }
        }
    }
}

/// Wide-format table: one row per (sample, class, alpha, analysis).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct MergedTable {
    records: Vec<MergedRecord>,
}

impl MergedTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Create a table from existing rows.
    #[must_use]
    pub fn from_records(records: Vec<MergedRecord>) -> Self {
        Self { records }
    }

    /// Append a row.
    pub fn push(&mut self, record: MergedRecord) {
        self.records.push(record);
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

    /// Borrow all rows.
    #[must_use]
    pub fn records(&self) -> &[MergedRecord] {
        &self.records
    }

    /// Mutably borrow all rows.
    pub fn records_mut(&mut self) -> &mut [MergedRecord] {
        &mut self.records
    }

    /// Unique class labels in canonical order.
    #[must_use]
    pub fn classes(&self) -> Vec<String> {
        let labels: Vec<String> = self.records.iter().map(|r| r.class().to_string()).collect();
        sort_class_labels(&labels)
    }

    /// Extract one wide column.
    #[must_use]
    pub fn column(&self, channel: Channel, metric: Metric) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| r.value(channel, metric))
            .collect()
    }

    /// Extract one wide column restricted to a class.
    #[must_use]
    pub fn class_column(&self, class: &str, channel: Channel, metric: Metric) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.class() == class)
            .map(|r| r.value(channel, metric))
            .collect()
    }

    /// Refresh the difference column of one metric on every row.
    pub fn recompute_coding(&mut self, metric: Metric) {
        for record in &mut self.records {
            record.recompute_coding(metric);
        }
    }
}
