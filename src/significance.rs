//! Significance tests, effect sizes, and curve summaries
//!
//! Per-class statistical validation of the encoding vs decoding comparison:
//!
//! - paired / one-sample t-tests with Bonferroni family-wise correction
//! - Cohen's d effect sizes, on the same normalization as the plotted scores
//! - trapezoidal area under the score-vs-alpha curve
//!
//! The library-backed pattern follows the renacer regression detector
//! (statistical machinery from crates, not ad-hoc thresholds); the Student's
//! t distribution comes from `statrs`. Both test kinds reduce to a
//! one-sample t on the per-sample differences, so they share one kernel and
//! differ only in the effect-size formula.

use crate::merge::merge_scores;
use crate::normalize::{normalize_merged, Covariate, NormalizeOptions};
use crate::score::{Channel, Coding, MergedTable, Metric, ScoreTable};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;
use tracing::debug;

/// Family-wise significance level for the Bonferroni correction
pub const FAMILY_WISE_ALPHA: f64 = 0.05;

/// Which t-test to run per class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// One-sample t-test of the per-sample difference against mean 0
    OneSample,
    /// Classical paired t-test between encoding and decoding scores
    Paired,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneSample => write!(f, "one_sample"),
            Self::Paired => write!(f, "paired"),
        }
    }
}

/// Significance-test configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestOptions {
    /// Covariate to residualize out of both direction columns before testing
    pub covariate: Option<Covariate>,
    /// Apply Bonferroni correction across the per-class p-values
    pub correction: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            covariate: None,
            correction: true,
        }
    }
}

/// Per-class t-test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTest {
    /// Class label
    pub class: String,
    /// t statistic
    pub statistic: f64,
    /// Two-sided p-value (corrected when requested)
    pub p_value: f64,
}

impl ClassTest {
    /// Whether this class rejects the null at [`FAMILY_WISE_ALPHA`].
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.p_value < FAMILY_WISE_ALPHA
    }
}

/// Per-class effect size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEffect {
    /// Class label
    pub class: String,
    /// Cohen's d (positive when encoding exceeds decoding)
    pub cohen_d: f64,
}

/// Per-class area under the score-vs-alpha curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAuc {
    /// Class label
    pub class: String,
    /// Trapezoidal area under the curve
    pub auc: f64,
}

/// Aggregate of one significance pass, serializable for provenance.
///
/// Mirrors the experiment-record shape: what was tested, with which options,
/// when, and the per-class outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceReport {
    /// Metric the test ran on
    pub metric: Metric,
    /// Test kind
    pub kind: TestKind,
    /// Whether p-values are Bonferroni-corrected
    pub corrected: bool,
    /// Per-class t-test results, canonical class order
    pub tests: Vec<ClassTest>,
    /// Per-class effect sizes, canonical class order
    pub effects: Vec<ClassEffect>,
    /// Report creation time
    pub generated_at: DateTime<Utc>,
}

/// Run a per-class t-test of encoding vs decoding over a merged table.
///
/// Classes are visited in canonical order. With `Paired`, the test compares
/// the encoding and decoding columns directly; with `OneSample`, it tests
/// the per-sample difference against population mean 0 — numerically the
/// same statistic, kept distinct to match the reporting conventions of the
/// two analyses.
///
/// When every per-sample difference in a class is exactly zero the test
/// reports `t = 0, p = 1` rather than the 0/0 NaN of the naive formula.
///
/// # Errors
///
/// Returns [`Error::InsufficientSamples`] for any class with fewer than 2
/// paired observations (which includes classes observed in only one coding
/// direction — those have no merged rows at all).
pub fn ttest(
    table: &MergedTable,
    metric: Metric,
    kind: TestKind,
    options: &TestOptions,
) -> Result<Vec<ClassTest>> {
    let table = residualized_copy(table, metric, options.covariate)?;
    let classes = table.classes();
    debug!(%metric, %kind, n_classes = classes.len(), "running per-class t-tests");

    let mut tests = Vec::with_capacity(classes.len());
    for class in classes {
        let encoding = table.class_column(&class, Channel::Encoding, metric);
        let decoding = table.class_column(&class, Channel::Decoding, metric);

        if encoding.len() < 2 {
            return Err(Error::InsufficientSamples {
                class,
                observed: encoding.len(),
            });
        }

        let differences: Vec<f64> = encoding
            .iter()
            .zip(&decoding)
            .map(|(&e, &d)| e - d)
            .collect();
        let (statistic, p_value) = one_sample_t(&differences);
        tests.push(ClassTest {
            class,
            statistic,
            p_value,
        });
    }

    if options.correction {
        let corrected = bonferroni(&tests.iter().map(|t| t.p_value).collect::<Vec<_>>());
        for (test, p) in tests.iter_mut().zip(corrected) {
            test.p_value = p;
        }
    }

    Ok(tests)
}

/// Run [`ttest`] starting from a long-format table.
///
/// Verifies that every class is observed in both coding directions before
/// merging, so a class present in only one direction surfaces as
/// [`Error::InsufficientSamples`] instead of silently vanishing from the
/// merged table.
///
/// # Errors
///
/// Returns [`Error::InsufficientSamples`] for one-direction classes;
/// propagates merge and [`ttest`] errors.
pub fn ttest_scores(
    table: &ScoreTable,
    metric: Metric,
    kind: TestKind,
    options: &TestOptions,
) -> Result<Vec<ClassTest>> {
    for class in table.classes() {
        let rows = table.filter_class(&class);
        let encoding = rows.filter_coding(Coding::Encoding).len();
        let decoding = rows.filter_coding(Coding::Decoding).len();
        if encoding == 0 || decoding == 0 {
            return Err(Error::InsufficientSamples {
                class,
                observed: encoding.min(decoding),
            });
        }
    }
    ttest(&merge_scores(table)?, metric, kind, options)
}

/// Bonferroni family-wise correction: `p' = min(p * m, 1)`.
///
/// Corrected p-values are never smaller than the raw ones, and equal them
/// when a single test is in the family.
#[must_use]
pub fn bonferroni(p_values: &[f64]) -> Vec<f64> {
    #[allow(clippy::cast_precision_loss)]
    let m = p_values.len() as f64;
    p_values.iter().map(|&p| (p * m).min(1.0)).collect()
}

/// Compute per-class Cohen's d effect sizes over a merged table.
///
/// Normalization (covariate residualization, joint min-max scaling) is
/// applied first per `options`, so the effect sizes stay comparable to the
/// plotted, normalized scores.
///
/// - `Paired` uses the two-sample pooled-variance formula (sample variances,
///   n−1 denominator).
/// - `OneSample` uses mean over population standard deviation of the
///   per-sample differences.
///
/// A zero-variance class yields d = 0 when the means agree and ±∞ otherwise.
///
/// # Errors
///
/// Returns [`Error::InsufficientSamples`] for classes with fewer than 2
/// paired observations; propagates normalization errors.
pub fn effect_size(
    table: &MergedTable,
    metric: Metric,
    kind: TestKind,
    options: &NormalizeOptions,
) -> Result<Vec<ClassEffect>> {
    let mut table = table.clone();
    normalize_merged(&mut table, metric, options)?;

    let classes = table.classes();
    let mut effects = Vec::with_capacity(classes.len());
    for class in classes {
        let encoding = table.class_column(&class, Channel::Encoding, metric);
        let decoding = table.class_column(&class, Channel::Decoding, metric);

        if encoding.len() < 2 {
            return Err(Error::InsufficientSamples {
                class,
                observed: encoding.len(),
            });
        }

        let cohen_d = match kind {
            TestKind::OneSample => {
                let differences: Vec<f64> = encoding
                    .iter()
                    .zip(&decoding)
                    .map(|(&e, &d)| e - d)
                    .collect();
                cohen_d_one_sample(&differences)
            }
            TestKind::Paired => cohen_d_two_sample(&encoding, &decoding),
        };
        effects.push(ClassEffect { class, cohen_d });
    }

    Ok(effects)
}

/// Run tests and effect sizes together and package them with provenance.
///
/// # Errors
///
/// Propagates [`ttest`] and [`effect_size`] errors.
pub fn report(
    table: &MergedTable,
    metric: Metric,
    kind: TestKind,
    test_options: &TestOptions,
    normalize_options: &NormalizeOptions,
) -> Result<SignificanceReport> {
    let tests = ttest(table, metric, kind, test_options)?;
    let effects = effect_size(table, metric, kind, normalize_options)?;
    Ok(SignificanceReport {
        metric,
        kind,
        corrected: test_options.correction,
        tests,
        effects,
        generated_at: Utc::now(),
    })
}

/// Trapezoidal area under a sampled curve.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the grids differ in length or carry
/// fewer than 2 points.
pub fn area_under_curve(x: &[f64], y: &[f64]) -> Result<f64> {
    if x.len() != y.len() {
        return Err(Error::InvalidInput(format!(
            "AUC grids differ in length: {} x-values vs {} y-values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "AUC needs at least 2 grid points, got {}",
            x.len()
        )));
    }
    Ok(x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum())
}

/// Per-class AUC of a metric over the alpha grid.
///
/// Each class must contribute exactly one observed value per grid point, in
/// grid order — the shape produced by averaging scores across samples before
/// plotting. A shape mismatch is an observable error here, never silently
/// skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when a class's observed values do not
/// line up one-to-one with the grid.
pub fn class_auc(table: &ScoreTable, metric: Metric, alphas: &[f64]) -> Result<Vec<ClassAuc>> {
    let subset = table.filter_alpha(alphas);
    let mut result = Vec::new();
    for class in subset.classes() {
        let values = subset.filter_class(&class).metric_values(metric);
        if values.len() != alphas.len() {
            return Err(Error::InvalidInput(format!(
                "Class '{class}' has {} observed value(s) for a {}-point alpha grid; \
                 average across samples before computing AUC",
                values.len(),
                alphas.len()
            )));
        }
        let auc = area_under_curve(alphas, &values)?;
        result.push(ClassAuc { class, auc });
    }
    Ok(result)
}

/// One-sample t statistic and two-sided p-value against population mean 0.
fn one_sample_t(values: &[f64]) -> (f64, f64) {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = sample_std(values);

    if sd < f64::EPSILON {
        // All differences identical: zero mean is a perfect null fit,
        // nonzero mean is infinitely far from it.
        if mean.abs() < f64::EPSILON {
            return (0.0, 1.0);
        }
        return (f64::INFINITY.copysign(mean), 0.0);
    }

    let statistic = mean / (sd / n.sqrt());
    let p_value = two_sided_p(statistic, n - 1.0);
    (statistic, p_value)
}

/// Two-sided p-value from the Student's t distribution.
fn two_sided_p(statistic: f64, freedom: f64) -> f64 {
    // freedom >= 1 by construction (n >= 2), so this cannot fail
    StudentsT::new(0.0, 1.0, freedom)
        .map_or(f64::NAN, |dist| 2.0 * dist.cdf(-statistic.abs()))
}

/// Cohen's d for a one-sample difference test: mean over population std.
fn cohen_d_one_sample(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sd = population_std(values);
    guarded_ratio(mean, sd)
}

/// Cohen's d for two samples with pooled variance (n−1 denominators).
fn cohen_d_two_sample(x: &[f64], y: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let (nx, ny) = (x.len() as f64, y.len() as f64);
    let dof = nx + ny - 2.0;
    let mean_x = x.iter().sum::<f64>() / nx;
    let mean_y = y.iter().sum::<f64>() / ny;
    let var_x = sample_std(x).powi(2);
    let var_y = sample_std(y).powi(2);
    let pooled = (((nx - 1.0) * var_x + (ny - 1.0) * var_y) / dof).sqrt();
    guarded_ratio(mean_x - mean_y, pooled)
}

fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator < f64::EPSILON {
        if numerator.abs() < f64::EPSILON {
            return 0.0;
        }
        return f64::INFINITY.copysign(numerator);
    }
    numerator / denominator
}

/// Sample standard deviation (n−1 denominator).
fn sample_std(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}

/// Population standard deviation (n denominator).
fn population_std(values: &[f64]) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt()
}

/// Residualize both direction columns when a covariate is requested,
/// leaving the input untouched.
fn residualized_copy(
    table: &MergedTable,
    metric: Metric,
    covariate: Option<Covariate>,
) -> Result<MergedTable> {
    let mut copy = table.clone();
    if covariate.is_some() {
        let options = NormalizeOptions {
            covariate,
            scale: false,
            range: None,
        };
        normalize_merged(&mut copy, metric, &options)?;
    }
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge_scores;
    use crate::score::{Coding, ScoreRecord};

    /// Paired samples for two classes; encoding uniformly above decoding in
    /// VIS, identical in DMN.
    fn merged_fixture() -> MergedTable {
        let mut table = ScoreTable::new();
        for i in 0..6 {
            // integer bases keep the paired differences exactly representable
            let base = f64::from(i);
            for (class, enc, dec) in [
                ("VIS", base + 1.0, base),
                ("DMN", base, base),
            ] {
                table.push(
                    ScoreRecord::builder(format!("s{i}"), class, Coding::Encoding, 1.0)
                        .performance(enc)
                        .capacity(enc * 10.0)
                        .n_nodes(64.0)
                        .build(),
                );
                table.push(
                    ScoreRecord::builder(format!("s{i}"), class, Coding::Decoding, 1.0)
                        .performance(dec)
                        .capacity(dec * 10.0)
                        .n_nodes(64.0)
                        .build(),
                );
            }
        }
        merge_scores(&table).unwrap()
    }

    #[test]
    fn test_identical_columns_give_null_result() {
        let merged = merged_fixture();
        let tests = ttest(
            &merged,
            Metric::Performance,
            TestKind::Paired,
            &TestOptions {
                covariate: None,
                correction: false,
            },
        )
        .unwrap();

        let dmn = tests.iter().find(|t| t.class == "DMN").unwrap();
        assert!((dmn.statistic - 0.0).abs() < f64::EPSILON);
        assert!((dmn.p_value - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_constant_positive_difference_is_significant() {
        let merged = merged_fixture();
        let tests = ttest(
            &merged,
            Metric::Performance,
            TestKind::OneSample,
            &TestOptions::default(),
        )
        .unwrap();

        let vis = tests.iter().find(|t| t.class == "VIS").unwrap();
        assert!(vis.statistic.is_infinite() && vis.statistic > 0.0);
        assert!(vis.p_value < 1e-6);
    }

    #[test]
    fn test_kinds_agree_on_statistic() {
        let merged = merged_fixture();
        let options = TestOptions {
            covariate: None,
            correction: false,
        };
        let paired = ttest(&merged, Metric::Capacity, TestKind::Paired, &options).unwrap();
        let one = ttest(&merged, Metric::Capacity, TestKind::OneSample, &options).unwrap();
        for (p, o) in paired.iter().zip(&one) {
            assert_eq!(p.statistic.to_bits(), o.statistic.to_bits());
        }
    }

    #[test]
    fn test_two_sided_p_symmetric_moderate_t() {
        // t = 2.0, df = 10: classical two-sided p ≈ 0.0734
        let p = two_sided_p(2.0, 10.0);
        assert!((p - 0.0734).abs() < 5e-3, "p = {p}");
        assert!((two_sided_p(-2.0, 10.0) - p).abs() < 1e-12);
    }

    #[test]
    fn test_bonferroni_monotone_and_clamped() {
        let raw = vec![0.01, 0.4, 0.9];
        let corrected = bonferroni(&raw);
        for (r, c) in raw.iter().zip(&corrected) {
            assert!(c >= r);
        }
        assert!((corrected[0] - 0.03).abs() < 1e-12);
        assert!((corrected[2] - 1.0).abs() < f64::EPSILON);
        // single test family is untouched
        assert_eq!(bonferroni(&[0.2]), vec![0.2]);
    }

    #[test]
    fn test_insufficient_samples_error() {
        let mut table = ScoreTable::new();
        for coding in [Coding::Encoding, Coding::Decoding] {
            table.push(
                ScoreRecord::builder("s0", "VIS", coding, 1.0)
                    .performance(0.5)
                    .capacity(1.0)
                    .build(),
            );
        }
        let merged = merge_scores(&table).unwrap();
        let err = ttest(
            &merged,
            Metric::Performance,
            TestKind::Paired,
            &TestOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSamples { observed: 1, .. }
        ));
    }

    #[test]
    fn test_one_direction_class_is_insufficient() {
        let mut table = ScoreTable::new();
        for i in 0..3 {
            for coding in [Coding::Encoding, Coding::Decoding] {
                table.push(
                    ScoreRecord::builder(format!("s{i}"), "VIS", coding, 1.0)
                        .performance(0.5 + f64::from(i))
                        .build(),
                );
            }
            // DMN observed only while encoding
            table.push(
                ScoreRecord::builder(format!("s{i}"), "DMN", Coding::Encoding, 1.0)
                    .performance(0.4)
                    .build(),
            );
        }

        let err = ttest_scores(
            &table,
            Metric::Performance,
            TestKind::Paired,
            &TestOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientSamples { class, observed: 0 } if class == "DMN"
        ));
    }

    #[test]
    fn test_effect_size_sign_follows_direction() {
        let merged = merged_fixture();
        let effects = effect_size(
            &merged,
            Metric::Performance,
            TestKind::Paired,
            &NormalizeOptions::raw(),
        )
        .unwrap();

        let vis = effects.iter().find(|e| e.class == "VIS").unwrap();
        let dmn = effects.iter().find(|e| e.class == "DMN").unwrap();
        assert!(vis.cohen_d > 0.0, "VIS d = {}", vis.cohen_d);
        assert!((dmn.cohen_d - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_effect_size_pooled_formula() {
        // hand-checked: x = [1,2,3], y = [0,1,2] → d = 1.0
        let d = cohen_d_two_sample(&[1.0, 2.0, 3.0], &[0.0, 1.0, 2.0]);
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_one_sample_effect_uses_population_std() {
        // diffs = [1, 3]: mean 2, population std 1 → d = 2
        let d = cohen_d_one_sample(&[1.0, 3.0]);
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_under_curve_trapezoid() {
        let auc = area_under_curve(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_under_curve_shape_errors() {
        assert!(area_under_curve(&[0.0, 1.0], &[0.0]).is_err());
        assert!(area_under_curve(&[0.0], &[0.0]).is_err());
    }

    #[test]
    fn test_class_auc_requires_one_value_per_grid_point() {
        let mut table = ScoreTable::new();
        for (alpha, perf) in [(0.5, 0.2), (1.0, 0.6), (1.5, 0.4)] {
            table.push(
                ScoreRecord::builder("avg", "VIS", Coding::Encoding, alpha)
                    .performance(perf)
                    .build(),
            );
        }
        let aucs = class_auc(&table, Metric::Performance, &[0.5, 1.0, 1.5]).unwrap();
        assert_eq!(aucs.len(), 1);
        assert!((aucs[0].auc - 0.45).abs() < 1e-12);

        // a second sample per grid point breaks the one-value-per-point shape
        table.push(
            ScoreRecord::builder("s1", "VIS", Coding::Encoding, 1.0)
                .performance(0.9)
                .build(),
        );
        assert!(class_auc(&table, Metric::Performance, &[0.5, 1.0, 1.5]).is_err());
    }

    #[test]
    fn test_report_round_trips_through_serde() {
        let merged = merged_fixture();
        let report = report(
            &merged,
            Metric::Capacity,
            TestKind::Paired,
            &TestOptions::default(),
            &NormalizeOptions::raw(),
        )
        .unwrap();
        let json = serde_json::to_string(&report).unwrap();
        let back: SignificanceReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report, back);
    }
}
