//! Long-format → wide-format score merging
//!
//! Reshapes a long table carrying both coding directions into one row per
//! `(sample_id, class, alpha, analysis)` with paired encoding/decoding
//! columns and their signed difference.
//!
//! The join is an explicit key-based inner join, not positional alignment:
//! a row pairs up if and only if the other direction holds a row with the
//! same key. Alpha participates in the key by bit pattern, which is correct
//! because both directions draw their alphas from one caller-supplied grid.
//!
//! Missing scores are imputed with the column mean of their coding
//! partition *before* the join, so a row is never dropped for missingness —
//! only for genuinely lacking a partner.

use crate::score::{Coding, Metric, MergedRecord, MergedTable, ScoreRecord, ScoreTable};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Join key of the wide format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MergeKey {
    sample_id: String,
    class: String,
    alpha_bits: u64,
    analysis: String,
}

impl MergeKey {
    fn of(record: &ScoreRecord) -> Self {
        Self {
            sample_id: record.sample_id().to_string(),
            class: record.class().to_string(),
            alpha_bits: record.alpha().to_bits(),
            analysis: record.analysis().to_string(),
        }
    }
}

/// Merge a long-format table into the wide paired format.
///
/// Output rows follow the encoding partition's order. Keys present in only
/// one direction are dropped (and logged at debug level); duplicate keys
/// within a direction violate the input invariant and are rejected.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the table is empty, lacks one of the
/// coding directions entirely, or holds duplicate rows for a join key.
///
/// # Examples
///
/// ```rust
/// use cotejar::merge::merge_scores;
/// use cotejar::score::{Channel, Coding, Metric, ScoreRecord, ScoreTable};
///
/// # fn main() -> cotejar::Result<()> {
/// let mut table = ScoreTable::new();
/// for (coding, perf) in [(Coding::Encoding, 0.9), (Coding::Decoding, 0.6)] {
///     table.push(
///         ScoreRecord::builder("sub-01", "VIS", coding, 1.0)
///             .performance(perf)
///             .capacity(5.0)
///             .build(),
///     );
/// }
///
/// let merged = merge_scores(&table)?;
/// assert_eq!(merged.len(), 1);
/// let row = &merged.records()[0];
/// assert!((row.value(Channel::Coding, Metric::Performance) - 0.3).abs() < 1e-12);
/// # Ok(())
/// # }
/// ```
pub fn merge_scores(table: &ScoreTable) -> Result<MergedTable> {
    if table.is_empty() {
        return Err(Error::InvalidInput(
            "Cannot merge an empty score table".to_string(),
        ));
    }

    let encoding = table.filter_coding(Coding::Encoding);
    let decoding = table.filter_coding(Coding::Decoding);

    if encoding.is_empty() || decoding.is_empty() {
        return Err(Error::InvalidInput(format!(
            "Merging needs both coding directions: {} encoding row(s), {} decoding row(s)",
            encoding.len(),
            decoding.len()
        )));
    }

    let encoding_fill = partition_means(&encoding);
    let decoding_fill = partition_means(&decoding);

    let mut decoding_by_key: HashMap<MergeKey, &ScoreRecord> =
        HashMap::with_capacity(decoding.len());
    for record in decoding.records() {
        if decoding_by_key.insert(MergeKey::of(record), record).is_some() {
            return Err(duplicate_key_error(record));
        }
    }

    let mut merged = MergedTable::new();
    let mut seen: HashSet<MergeKey> = HashSet::with_capacity(encoding.len());
    let mut unmatched_encoding = 0usize;

    for record in encoding.records() {
        let key = MergeKey::of(record);
        if !seen.insert(key.clone()) {
            return Err(duplicate_key_error(record));
        }
        match decoding_by_key.remove(&key) {
            Some(partner) => {
                merged.push(MergedRecord::from_pair(
                    record,
                    partner,
                    imputed_scores(record, encoding_fill),
                    imputed_scores(partner, decoding_fill),
                ));
            }
            None => {
                unmatched_encoding += 1;
                debug!(
                    sample_id = record.sample_id(),
                    class = record.class(),
                    alpha = record.alpha(),
                    "encoding row has no decoding partner; dropped"
                );
            }
        }
    }

    if unmatched_encoding > 0 || !decoding_by_key.is_empty() {
        debug!(
            unmatched_encoding,
            unmatched_decoding = decoding_by_key.len(),
            "dropped unpaired rows during merge"
        );
    }

    Ok(merged)
}

/// Per-partition column means used to impute missing scores.
///
/// `None` for a metric means the partition observed no values at all; rows
/// missing that metric then impute 0 with a warning rather than aborting the
/// merge.
fn partition_means(partition: &ScoreTable) -> (Option<f64>, Option<f64>) {
    (
        column_mean(&partition.metric_values(Metric::Performance)),
        column_mean(&partition.metric_values(Metric::Capacity)),
    )
}

fn column_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn imputed_scores(record: &ScoreRecord, fill: (Option<f64>, Option<f64>)) -> (f64, f64) {
    (
        impute(record, Metric::Performance, fill.0),
        impute(record, Metric::Capacity, fill.1),
    )
}

fn impute(record: &ScoreRecord, metric: Metric, fill: Option<f64>) -> f64 {
    record.metric(metric).unwrap_or_else(|| {
        let fallback = fill.unwrap_or(0.0);
        if fill.is_none() {
            warn!(
                sample_id = record.sample_id(),
                class = record.class(),
                %metric,
                "no observed values in partition to impute from; using 0"
            );
        }
        fallback
    })
}

fn duplicate_key_error(record: &ScoreRecord) -> Error {
    Error::InvalidInput(format!(
        "Duplicate {} row for (sample '{}', class '{}', alpha {}, analysis '{}'): \
         at most one row per direction and key is allowed",
        record.coding(),
        record.sample_id(),
        record.class(),
        record.alpha(),
        record.analysis()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::Channel;

    fn rec(sample: &str, class: &str, coding: Coding, alpha: f64) -> ScoreRecordBuilderShim {
        ScoreRecordBuilderShim {
            inner: ScoreRecord::builder(sample, class, coding, alpha).analysis("reliability"),
        }
    }

    // small shim so tests read as (perf, cap) pairs
    struct ScoreRecordBuilderShim {
        inner: crate::score::ScoreRecordBuilder,
    }

    impl ScoreRecordBuilderShim {
        fn scores(self, perf: f64, cap: f64) -> ScoreRecord {
            self.inner.performance(perf).capacity(cap).build()
        }
        fn missing_perf(self, cap: f64) -> ScoreRecord {
            self.inner.capacity(cap).build()
        }
    }

    #[test]
    fn test_merge_pairs_and_difference() {
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.6, 5.0),
            rec("s2", "VIS", Coding::Encoding, 1.0).scores(0.8, 7.0),
            rec("s2", "VIS", Coding::Decoding, 1.0).scores(0.7, 9.0),
        ]);

        let merged = merge_scores(&table).unwrap();
        assert_eq!(merged.len(), 2);
        for row in merged.records() {
            let diff = row.value(Channel::Encoding, Metric::Performance)
                - row.value(Channel::Decoding, Metric::Performance);
            assert!((row.value(Channel::Coding, Metric::Performance) - diff).abs() < 1e-12);
        }
    }

    #[test]
    fn test_merge_preserves_encoding_order() {
        let table = ScoreTable::from_records(vec![
            rec("s2", "VIS", Coding::Encoding, 1.0).scores(0.8, 7.0),
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.6, 5.0),
            rec("s2", "VIS", Coding::Decoding, 1.0).scores(0.7, 9.0),
        ]);
        let merged = merge_scores(&table).unwrap();
        let ids: Vec<&str> = merged.records().iter().map(MergedRecord::sample_id).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }

    #[test]
    fn test_merge_imputes_partition_mean() {
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.4, 8.0),
            rec("s2", "VIS", Coding::Encoding, 1.0).missing_perf(6.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.3, 5.0),
            rec("s2", "VIS", Coding::Decoding, 1.0).scores(0.5, 9.0),
        ]);

        let merged = merge_scores(&table).unwrap();
        assert_eq!(merged.len(), 2, "imputation must not drop rows");
        // s2's missing encoding performance imputed with the encoding mean (0.4)
        let s2 = merged
            .records()
            .iter()
            .find(|r| r.sample_id() == "s2")
            .unwrap();
        assert!((s2.value(Channel::Encoding, Metric::Performance) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_merge_drops_unpaired_keys() {
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.6, 5.0),
            rec("s3", "VIS", Coding::Encoding, 2.0).scores(0.5, 4.0), // no partner
        ]);
        let merged = merge_scores(&table).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.records()[0].sample_id(), "s1");
    }

    #[test]
    fn test_merge_joins_on_key_not_position() {
        // Same keys, deliberately shuffled partition order: a positional
        // alignment would pair s1 with s2's decoding row.
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0),
            rec("s2", "VIS", Coding::Encoding, 1.0).scores(0.8, 7.0),
            rec("s2", "VIS", Coding::Decoding, 1.0).scores(0.7, 9.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.6, 5.0),
        ]);
        let merged = merge_scores(&table).unwrap();
        let s1 = merged
            .records()
            .iter()
            .find(|r| r.sample_id() == "s1")
            .unwrap();
        assert!((s1.value(Channel::Decoding, Metric::Performance) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_merge_rejects_duplicate_key() {
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0),
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.8, 7.0),
            rec("s1", "VIS", Coding::Decoding, 1.0).scores(0.6, 5.0),
        ]);
        assert!(merge_scores(&table).is_err());
    }

    #[test]
    fn test_merge_requires_both_directions() {
        let table = ScoreTable::from_records(vec![
            rec("s1", "VIS", Coding::Encoding, 1.0).scores(0.9, 8.0)
        ]);
        let err = merge_scores(&table).unwrap_err();
        assert!(err.to_string().contains("both coding directions"));
    }

    #[test]
    fn test_merge_empty_table() {
        assert!(merge_scores(&ScoreTable::new()).is_err());
    }
}
