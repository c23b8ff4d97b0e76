//! Class-label taxonomy and canonical orderings
//!
//! Anatomical/functional class labels arrive as an unordered set. Figures and
//! per-class statistics must present them in one of two fixed reference
//! orderings so that palette positions stay stable across figures:
//!
//! - resting-state networks: `VIS, SM, DA, VA, LIM, FP, DMN`
//! - von Economo classes: `PSS, PS, PM, LIM, AC1, IC, AC2`
//!
//! Either ordering grows a trailing `subctx` entry when the input contains
//! the subcortical label. Inputs matching neither vocabulary pass through
//! unchanged.

/// Resting-state network labels in canonical order (without `subctx`)
pub const RSN_LABELS: [&str; 7] = ["VIS", "SM", "DA", "VA", "LIM", "FP", "DMN"];

/// Von Economo class labels in canonical order (without `subctx`)
pub const VON_ECONOMO_LABELS: [&str; 7] = ["PSS", "PS", "PM", "LIM", "AC1", "IC", "AC2"];

/// Subcortical label, appended last to either vocabulary when present
pub const SUBCTX_LABEL: &str = "subctx";

/// Reference vocabulary a label set was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalOrder {
    /// Resting-state networks (Yeo 7-network parcellation)
    RestingState,
    /// Von Economo cytoarchitectonic classes
    VonEconomo,
    /// Unknown vocabulary; input order preserved
    Unrecognized,
}

/// Sort a set of class labels into canonical order.
///
/// Membership is a full-subset test: every input label (ignoring `subctx`)
/// must belong to a reference vocabulary for that ordering to apply. The
/// resting-state vocabulary is checked first, so labels shared by both
/// (`LIM`) resolve to the resting-state ordering.
///
/// Labels matching neither vocabulary are returned in first-occurrence order
/// with duplicates dropped. Re-sorting an already-sorted sequence returns it
/// unchanged.
///
/// # Examples
///
/// ```rust
/// use cotejar::taxonomy::sort_class_labels;
///
/// let sorted = sort_class_labels(&["DMN".into(), "VIS".into(), "subctx".into()]);
/// assert_eq!(sorted, vec!["VIS", "DMN", "subctx"]);
/// ```
#[must_use]
pub fn sort_class_labels(class_labels: &[String]) -> Vec<String> {
    let (order, _) = classify_labels(class_labels);
    let reference: &[&str] = match order {
        CanonicalOrder::RestingState => &RSN_LABELS,
        CanonicalOrder::VonEconomo => &VON_ECONOMO_LABELS,
        CanonicalOrder::Unrecognized => return dedup_preserving_order(class_labels),
    };

    let mut sorted: Vec<String> = reference
        .iter()
        .filter(|label| class_labels.iter().any(|l| l == *label))
        .map(ToString::to_string)
        .collect();

    if class_labels.iter().any(|l| l == SUBCTX_LABEL) {
        sorted.push(SUBCTX_LABEL.to_string());
    }

    sorted
}

/// Identify which reference vocabulary a label set belongs to.
///
/// Returns the matched ordering and whether the subcortical label is present.
#[must_use]
pub fn classify_labels(class_labels: &[String]) -> (CanonicalOrder, bool) {
    let has_subctx = class_labels.iter().any(|l| l == SUBCTX_LABEL);
    let cortical: Vec<&String> = class_labels
        .iter()
        .filter(|l| l.as_str() != SUBCTX_LABEL)
        .collect();

    let subset_of = |vocab: &[&str]| cortical.iter().all(|l| vocab.contains(&l.as_str()));

    if cortical.is_empty() {
        // Only subctx (or nothing): no cortical vocabulary to decide between
        return (CanonicalOrder::Unrecognized, has_subctx);
    }

    if subset_of(&RSN_LABELS) {
        (CanonicalOrder::RestingState, has_subctx)
    } else if subset_of(&VON_ECONOMO_LABELS) {
        (CanonicalOrder::VonEconomo, has_subctx)
    } else {
        (CanonicalOrder::Unrecognized, has_subctx)
    }
}

fn dedup_preserving_order(labels: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for label in labels {
        if !seen.contains(label) {
            seen.push(label.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_rsn_ordering() {
        let input = labels(&["DMN", "VIS", "FP", "SM"]);
        assert_eq!(sort_class_labels(&input), labels(&["VIS", "SM", "FP", "DMN"]));
    }

    #[test]
    fn test_von_economo_ordering() {
        let input = labels(&["IC", "PSS", "AC2", "AC1"]);
        assert_eq!(
            sort_class_labels(&input),
            labels(&["PSS", "AC1", "IC", "AC2"])
        );
    }

    #[test]
    fn test_subctx_appended_last() {
        let input = labels(&["subctx", "DA", "VIS"]);
        assert_eq!(sort_class_labels(&input), labels(&["VIS", "DA", "subctx"]));
    }

    #[test]
    fn test_unknown_vocabulary_passes_through() {
        let input = labels(&["zeta", "alpha", "zeta"]);
        assert_eq!(sort_class_labels(&input), labels(&["zeta", "alpha"]));
    }

    #[test]
    fn test_mixed_vocabulary_is_unrecognized() {
        // VIS is resting-state, PSS is von Economo; the set belongs to neither
        let input = labels(&["VIS", "PSS"]);
        let (order, _) = classify_labels(&input);
        assert_eq!(order, CanonicalOrder::Unrecognized);
        assert_eq!(sort_class_labels(&input), input);
    }

    #[test]
    fn test_shared_label_resolves_to_resting_state() {
        let input = labels(&["LIM"]);
        let (order, _) = classify_labels(&input);
        assert_eq!(order, CanonicalOrder::RestingState);
    }

    #[test]
    fn test_idempotent() {
        let once = sort_class_labels(&labels(&["FP", "VA", "subctx", "SM"]));
        let twice = sort_class_labels(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_full_vocabulary_round_trip() {
        let mut full = labels(&RSN_LABELS);
        full.push(SUBCTX_LABEL.to_string());
        assert_eq!(sort_class_labels(&full), full);
    }
}
