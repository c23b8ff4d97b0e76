//! # Cotejar: Encoding vs Decoding Score Comparison
//!
//! Cotejar is a statistical comparison engine for reservoir-computing
//! experiments: it takes precomputed encoding/decoding performance and
//! capacity scores, stratified by anatomical/functional class and a control
//! parameter alpha, and produces normalized tables, paired significance
//! tests, effect sizes, and figure specifications for an external rendering
//! collaborator.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: degenerate ranges and under-sampled classes are
//!   typed errors, never silent NaN
//! - **Genchi Genbutsu**: joint min/max scaling keeps paired columns on one
//!   observable scale
//! - **Muda elimination**: one keyed merge replaces per-figure reshaping
//!
//! ## Pipeline stages
//!
//! ```text
//! long scores ──▶ normalize (residualize + scale) ──▶ merge (wide pairs)
//!                                                        │
//!                              figures ◀── significance ─┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use cotejar::score::{Coding, Metric, ScoreRecord, ScoreTable};
//! use cotejar::significance::TestKind;
//! use cotejar::Pipeline;
//!
//! # fn main() -> cotejar::Result<()> {
//! let mut table = ScoreTable::new();
//! for i in 0..4 {
//!     let base = f64::from(i);
//!     table.push(
//!         ScoreRecord::builder(format!("s{i}"), "VIS", Coding::Encoding, 1.0)
//!             .performance(base + 1.5)
//!             .capacity(base * 2.0)
//!             .build(),
//!     );
//!     table.push(
//!         ScoreRecord::builder(format!("s{i}"), "VIS", Coding::Decoding, 1.0)
//!             .performance(base)
//!             .capacity(base)
//!             .build(),
//!     );
//! }
//!
//! let pipeline = Pipeline::builder().correction(true).build();
//! let merged = pipeline.merge(&table)?;
//! let report = pipeline.report(&merged, Metric::Performance, TestKind::Paired)?;
//! assert_eq!(report.tests.len(), 1);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod error;
pub mod figures;
pub mod merge;
pub mod normalize;
pub mod score;
pub mod significance;
pub mod storage;
pub mod taxonomy;

pub use error::{Error, Result};

use normalize::{Covariate, NormalizeOptions, ScoreRange};
use score::{MergedTable, Metric, ScoreTable};
use significance::{
    ClassEffect, ClassTest, SignificanceReport, TestKind, TestOptions,
};

/// Configured analysis pipeline.
///
/// Bundles the normalization and testing options that the reference
/// workflow kept in process-wide state, threading them explicitly through
/// every stage instead.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    covariate: Option<Covariate>,
    scale: bool,
    range: Option<ScoreRange>,
    correction: bool,
}

impl Pipeline {
    /// Create a pipeline builder.
    #[must_use]
    pub const fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Normalization options implied by this configuration.
    #[must_use]
    pub const fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            covariate: self.covariate,
            scale: self.scale,
            range: self.range,
        }
    }

    /// Test options implied by this configuration.
    #[must_use]
    pub const fn test_options(&self) -> TestOptions {
        TestOptions {
            covariate: self.covariate,
            correction: self.correction,
        }
    }

    /// Normalize a long-format score column in place.
    ///
    /// # Errors
    ///
    /// Propagates [`normalize::normalize`] errors.
    pub fn normalize(&self, table: &mut ScoreTable, metric: Metric) -> Result<()> {
        normalize::normalize(table, metric, &self.normalize_options())
    }

    /// Merge a long-format table into wide paired form.
    ///
    /// # Errors
    ///
    /// Propagates [`merge::merge_scores`] errors.
    pub fn merge(&self, table: &ScoreTable) -> Result<MergedTable> {
        merge::merge_scores(table)
    }

    /// Per-class t-tests over a merged table.
    ///
    /// # Errors
    ///
    /// Propagates [`significance::ttest`] errors.
    pub fn ttest(
        &self,
        table: &MergedTable,
        metric: Metric,
        kind: TestKind,
    ) -> Result<Vec<ClassTest>> {
        significance::ttest(table, metric, kind, &self.test_options())
    }

    /// Per-class t-tests straight from a long-format table, rejecting
    /// classes observed in only one coding direction.
    ///
    /// # Errors
    ///
    /// Propagates [`significance::ttest_scores`] errors.
    pub fn ttest_scores(
        &self,
        table: &ScoreTable,
        metric: Metric,
        kind: TestKind,
    ) -> Result<Vec<ClassTest>> {
        significance::ttest_scores(table, metric, kind, &self.test_options())
    }

    /// Per-class Cohen's d over a merged table, on this pipeline's
    /// normalization.
    ///
    /// # Errors
    ///
    /// Propagates [`significance::effect_size`] errors.
    pub fn effect_size(
        &self,
        table: &MergedTable,
        metric: Metric,
        kind: TestKind,
    ) -> Result<Vec<ClassEffect>> {
        significance::effect_size(table, metric, kind, &self.normalize_options())
    }

    /// Tests and effect sizes packaged with provenance.
    ///
    /// # Errors
    ///
    /// Propagates [`significance::report`] errors.
    pub fn report(
        &self,
        table: &MergedTable,
        metric: Metric,
        kind: TestKind,
    ) -> Result<SignificanceReport> {
        significance::report(
            table,
            metric,
            kind,
            &self.test_options(),
            &self.normalize_options(),
        )
    }
}

/// Pipeline builder
#[derive(Debug, Clone, Copy)]
pub struct PipelineBuilder {
    covariate: Option<Covariate>,
    scale: bool,
    range: Option<ScoreRange>,
    correction: bool,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Start from the defaults: scaling on, no covariate, correction on.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            covariate: None,
            scale: true,
            range: None,
            correction: true,
        }
    }

    /// Regress this covariate out of score columns before analysis.
    #[must_use]
    pub const fn covariate(mut self, covariate: Covariate) -> Self {
        self.covariate = Some(covariate);
        self
    }

    /// Toggle min-max scaling.
    #[must_use]
    pub const fn scale(mut self, scale: bool) -> Self {
        self.scale = scale;
        self
    }

    /// Use an explicit scaling range instead of observed extrema.
    #[must_use]
    pub const fn range(mut self, range: ScoreRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Toggle Bonferroni correction of per-class p-values.
    #[must_use]
    pub const fn correction(mut self, correction: bool) -> Self {
        self.correction = correction;
        self
    }

    /// Build the pipeline.
    #[must_use]
    pub const fn build(self) -> Pipeline {
        Pipeline {
            covariate: self.covariate,
            scale: self.scale,
            range: self.range,
            correction: self.correction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let pipeline = Pipeline::builder().build();
        let options = pipeline.normalize_options();
        assert!(options.scale);
        assert!(options.covariate.is_none());
        assert!(pipeline.test_options().correction);
    }

    #[test]
    fn test_builder_threads_covariate_everywhere() {
        let pipeline = Pipeline::builder()
            .covariate(Covariate::NodeCount)
            .scale(false)
            .correction(false)
            .build();
        assert_eq!(
            pipeline.normalize_options().covariate,
            Some(Covariate::NodeCount)
        );
        assert_eq!(
            pipeline.test_options().covariate,
            Some(Covariate::NodeCount)
        );
        assert!(!pipeline.test_options().correction);
    }
}
