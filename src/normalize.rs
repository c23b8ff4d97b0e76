//! Score normalization: covariate residualization and min-max scaling
//!
//! Two optional, composable transforms applied to a score column before
//! comparison or plotting:
//!
//! 1. **Residualization** — fit an ordinary least-squares line of the score
//!    against a covariate (network size) and keep only the residuals,
//!    removing the covariate's linear contribution.
//! 2. **Min-max scaling** — map the (possibly residualized) column onto
//!    `[0, 1]` using either the observed extrema or a caller-supplied range.
//!
//! When encoding and decoding columns are normalized as a pair, both MUST be
//! scaled with one min/max computed jointly across the two, so they remain
//! comparable on a single scale. That is a correctness invariant of every
//! paired entry point here, not a display preference.

use crate::score::{Channel, MergedTable, Metric, ScoreTable};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Covariate whose linear effect can be regressed out of a score column.
///
/// An explicit parameter threaded through every call; there is no
/// process-wide default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Covariate {
    /// Number of reservoir nodes in the sample's class (`n_nodes` column)
    NodeCount,
}

/// Explicit scaling range override
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    /// Value mapped to 0
    pub min: f64,
    /// Value mapped to 1
    pub max: f64,
}

impl ScoreRange {
    /// Create a range override.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Normalization configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Covariate to residualize out before scaling (default: none)
    pub covariate: Option<Covariate>,
    /// Whether to min-max scale (callers usually want this on)
    pub scale: bool,
    /// Explicit min/max override; observed extrema when absent
    pub range: Option<ScoreRange>,
}

impl NormalizeOptions {
    /// Scaling on, no residualization, observed extrema.
    #[must_use]
    pub const fn scaled() -> Self {
        Self {
            covariate: None,
            scale: true,
            range: None,
        }
    }

    /// Everything off: the identity transform.
    #[must_use]
    pub const fn raw() -> Self {
        Self {
            covariate: None,
            scale: false,
            range: None,
        }
    }

    /// Set the covariate to regress out.
    #[must_use]
    pub const fn with_covariate(mut self, covariate: Covariate) -> Self {
        self.covariate = Some(covariate);
        self
    }

    /// Set an explicit scaling range.
    #[must_use]
    pub const fn with_range(mut self, range: ScoreRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Ordinary least-squares fit of `y` against `x`, single predictor with
/// intercept. Returns `(intercept, slope)`.
///
/// A zero-variance predictor yields slope 0 and intercept `mean(y)` (the
/// minimum-norm solution), so residualization degrades to mean centering.
#[must_use]
pub fn ols_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    debug_assert_eq!(x.len(), y.len());
    #[allow(clippy::cast_precision_loss)]
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let sxx: f64 = x.iter().map(|&xi| (xi - mean_x).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(y)
        .map(|(&xi, &yi)| (xi - mean_x) * (yi - mean_y))
        .sum();

    if sxx < f64::EPSILON {
        return (mean_y, 0.0);
    }

    let slope = sxy / sxx;
    (slope.mul_add(-mean_x, mean_y), slope)
}

/// Replace observed values of a metric column with OLS residuals against the
/// covariate. Missing values stay missing.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when fewer than 2 observed (score,
/// covariate) pairs are available to fit the line.
pub fn residualize(table: &mut ScoreTable, metric: Metric, covariate: Covariate) -> Result<()> {
    let Covariate::NodeCount = covariate;

    let (x, y): (Vec<f64>, Vec<f64>) = table
        .records()
        .iter()
        .filter_map(|r| r.metric(metric).map(|v| (r.n_nodes(), v)))
        .unzip();

    if y.len() < 2 {
        return Err(Error::InvalidInput(format!(
            "Cannot residualize '{metric}' against covariate: {} observed value(s), need at least 2",
            y.len()
        )));
    }

    let (intercept, slope) = ols_fit(&x, &y);
    debug!(%metric, intercept, slope, "residualizing score column");

    for record in table.records_mut() {
        if let Some(value) = record.metric(metric) {
            let predicted = slope.mul_add(record.n_nodes(), intercept);
            record.set_metric(metric, Some(value - predicted));
        }
    }

    Ok(())
}

/// Min-max scale the observed values of a metric column onto `[0, 1]`.
///
/// # Errors
///
/// Returns [`Error::DegenerateRange`] when the effective range has zero
/// width, instead of silently producing NaN/Inf.
pub fn scale(table: &mut ScoreTable, metric: Metric, range: Option<ScoreRange>) -> Result<()> {
    let observed = table.metric_values(metric);
    let Some(range) = effective_range(range, &observed) else {
        return Ok(()); // nothing observed, nothing to scale
    };
    check_range(range)?;

    for record in table.records_mut() {
        if let Some(value) = record.metric(metric) {
            record.set_metric(metric, Some(rescale(value, range)));
        }
    }
    Ok(())
}

/// Apply residualization and scaling to a single long-format column,
/// per the options.
///
/// # Errors
///
/// Propagates [`residualize`] and [`scale`] errors.
pub fn normalize(table: &mut ScoreTable, metric: Metric, options: &NormalizeOptions) -> Result<()> {
    if let Some(covariate) = options.covariate {
        residualize(table, metric, covariate)?;
    }
    if options.scale {
        scale(table, metric, options.range)?;
    }
    Ok(())
}

/// Normalize paired encoding/decoding long-format tables with a shared scale.
///
/// Residualization is fitted per table (each direction gets its own line);
/// min-max scaling uses one range computed jointly across both tables, unless
/// an explicit range is supplied.
///
/// # Errors
///
/// Propagates [`residualize`] errors; returns [`Error::DegenerateRange`] when
/// the joint range has zero width.
pub fn normalize_joint(
    encoding: &mut ScoreTable,
    decoding: &mut ScoreTable,
    metric: Metric,
    options: &NormalizeOptions,
) -> Result<()> {
    if let Some(covariate) = options.covariate {
        residualize(encoding, metric, covariate)?;
        residualize(decoding, metric, covariate)?;
    }

    if options.scale {
        let mut observed = encoding.metric_values(metric);
        observed.extend(decoding.metric_values(metric));
        let Some(range) = effective_range(options.range, &observed) else {
            return Ok(());
        };
        check_range(range)?;
        scale(encoding, metric, Some(range))?;
        scale(decoding, metric, Some(range))?;
    }
    Ok(())
}

/// Normalize the encoding and decoding columns of a merged table with a
/// shared scale, then refresh the derived difference column.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] on an empty table when residualization is
/// requested, [`Error::DegenerateRange`] on a zero-width joint range.
pub fn normalize_merged(
    table: &mut MergedTable,
    metric: Metric,
    options: &NormalizeOptions,
) -> Result<()> {
    if let Some(Covariate::NodeCount) = options.covariate {
        let x: Vec<f64> = table.records().iter().map(|r| r.n_nodes()).collect();
        if x.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "Cannot residualize merged '{metric}' columns: {} row(s), need at least 2",
                x.len()
            )));
        }
        for channel in [Channel::Encoding, Channel::Decoding] {
            let y = table.column(channel, metric);
            let (intercept, slope) = ols_fit(&x, &y);
            debug!(%channel, %metric, intercept, slope, "residualizing merged column");
            for record in table.records_mut() {
                let predicted = slope.mul_add(record.n_nodes(), intercept);
                let value = record.value(channel, metric);
                record.set_value(channel, metric, value - predicted);
            }
        }
    }

    if options.scale {
        let mut observed = table.column(Channel::Encoding, metric);
        observed.extend(table.column(Channel::Decoding, metric));
        let Some(range) = effective_range(options.range, &observed) else {
            return Ok(());
        };
        check_range(range)?;
        for record in table.records_mut() {
            for channel in [Channel::Encoding, Channel::Decoding] {
                let value = record.value(channel, metric);
                record.set_value(channel, metric, rescale(value, range));
            }
        }
    }

    table.recompute_coding(metric);
    Ok(())
}

/// Explicit range if supplied, observed extrema otherwise, `None` when there
/// is nothing observed to scale.
fn effective_range(explicit: Option<ScoreRange>, observed: &[f64]) -> Option<ScoreRange> {
    if let Some(range) = explicit {
        return Some(range);
    }
    if observed.is_empty() {
        return None;
    }
    let min = observed.iter().copied().fold(f64::INFINITY, f64::min);
    let max = observed.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(ScoreRange { min, max })
}

fn check_range(range: ScoreRange) -> Result<()> {
    if (range.max - range.min).abs() < f64::EPSILON {
        return Err(Error::DegenerateRange {
            min: range.min,
            max: range.max,
        });
    }
    Ok(())
}

fn rescale(value: f64, range: ScoreRange) -> f64 {
    (value - range.min) / (range.max - range.min)
}
