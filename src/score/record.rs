//! Score Record - one long-format observation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of information flow through the modeled network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coding {
    /// Stimulus → reservoir readout
    Encoding,
    /// Reservoir state → stimulus reconstruction
    Decoding,
}

impl fmt::Display for Coding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encoding => write!(f, "encoding"),
            Self::Decoding => write!(f, "decoding"),
        }
    }
}

impl FromStr for Coding {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "encoding" => Ok(Self::Encoding),
            "decoding" => Ok(Self::Decoding),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown coding direction: '{other}' (expected 'encoding' or 'decoding')"
            ))),
        }
    }
}

/// Which measured quantity to analyze
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Task performance score
    Performance,
    /// Memory capacity score
    Capacity,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Performance => write!(f, "performance"),
            Self::Capacity => write!(f, "capacity"),
        }
    }
}

/// Score Record represents one long-format observation.
///
/// One row per (sample, class, coding direction, alpha). Sample identifiers
/// are not unique across coding directions; the pair of rows sharing
/// `(sample_id, class, alpha, analysis)` is what the merger joins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    sample_id: String,
    class: String,
    coding: Coding,
    alpha: f64,
    performance: Option<f64>,
    capacity: Option<f64>,
    n_nodes: f64,
    analysis: String,
}

impl ScoreRecord {
    /// Create a builder for constructing a score record.
    ///
    /// # Arguments
    ///
    /// * `sample_id` - Identifier of the originating simulation/subject
    /// * `class` - Anatomical/functional class label
    /// * `coding` - Coding direction of this observation
    /// * `alpha` - Control parameter value
    #[must_use]
    pub fn builder(
        sample_id: impl Into<String>,
        class: impl Into<String>,
        coding: Coding,
        alpha: f64,
    ) -> ScoreRecordBuilder {
        ScoreRecordBuilder::new(sample_id, class, coding, alpha)
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

    /// Get the coding direction.
    #[must_use]
    pub const fn coding(&self) -> Coding {
        self.coding
    }

    /// Get the control parameter value.
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Get the performance score, if observed.
    #[must_use]
    pub const fn performance(&self) -> Option<f64> {
        self.performance
    }

    /// Get the capacity score, if observed.
    #[must_use]
    pub const fn capacity(&self) -> Option<f64> {
        self.capacity
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

    /// Get the requested metric value, if observed.
    #[must_use]
    pub const fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Performance => self.performance,
            Metric::Capacity => self.capacity,
        }
    }

    /// Replace the requested metric value.
    pub fn set_metric(&mut self, metric: Metric, value: Option<f64>) {
        match metric {
            Metric::Performance => self.performance = value,
            Metric::Capacity => self.capacity = value,
        }
    }
}

/// Builder for [`ScoreRecord`].
#[derive(Debug)]
pub struct ScoreRecordBuilder {
    sample_id: String,
    class: String,
    coding: Coding,
    alpha: f64,
    performance: Option<f64>,
    capacity: Option<f64>,
    n_nodes: f64,
    analysis: String,
}

impl ScoreRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        sample_id: impl Into<String>,
        class: impl Into<String>,
        coding: Coding,
        alpha: f64,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            class: class.into(),
            coding,
            alpha,
            performance: None,
            capacity: None,
            n_nodes: 0.0,
            analysis: String::new(),
        }
    }

    /// Set the performance score.
    #[must_use]
    pub const fn performance(mut self, value: f64) -> Self {
        self.performance = Some(value);
        self
    }

    /// Set the capacity score.
    #[must_use]
    pub const fn capacity(mut self, value: f64) -> Self {
        self.capacity = Some(value);
        self
    }

    /// Set the node-count covariate.
    #[must_use]
    pub const fn n_nodes(mut self, value: f64) -> Self {
        self.n_nodes = value;
        self
    }

    /// Set the analysis regime tag.
    #[must_use]
    pub fn analysis(mut self, value: impl Into<String>) -> Self {
        self.analysis = value.into();
        self
    }

    /// Build the [`ScoreRecord`].
    #[must_use]
    pub fn build(self) -> ScoreRecord {
        ScoreRecord {
            sample_id: self.sample_id,
            class: self.class,
            coding: self.coding,
            alpha: self.alpha,
            performance: self.performance,
            capacity: self.capacity,
            n_nodes: self.n_nodes,
            analysis: self.analysis,
        }
    }
}
