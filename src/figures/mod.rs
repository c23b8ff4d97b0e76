//! Figure orchestration
//!
//! Prepares normalized, ordered, color-assigned data for the rendering
//! collaborator. The crate never touches pixels or files: a [`Renderer`]
//! receives a finished [`Figure`] spec and owns drawing and export.
//!
//! Each orchestration function mirrors one research figure family:
//!
//! - score vs alpha, between classes (line, per-alpha boxes)
//! - score per class, averaged across alpha (boxes)
//! - encoding vs decoding, within class (scatter / joint grids)
//! - validation summaries (coding-score boxes, effect-size bars)
//!
//! Normalization errors propagate; nothing here absorbs a failure to keep a
//! figure alive.

use crate::normalize::{normalize, normalize_joint, normalize_merged, NormalizeOptions};
use crate::score::{Channel, Coding, MergedTable, Metric, ScoreTable};
use crate::significance::{class_auc, effect_size, TestKind};
use crate::{merge::merge_scores, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Encoding-direction accent color
pub const ENCODING_COLOR: &str = "#E55FA3";
/// Decoding-direction accent color
pub const DECODING_COLOR: &str = "#6CC8BA";

/// Class palette (husl wheel, 8 hues); position i colors canonical class i
pub const CLASS_PALETTE: [&str; 8] = [
    "#F77189", "#CE9032", "#97A431", "#32B166", "#36ADA4", "#39A7D1", "#A48CF4", "#F561DD",
];

/// Marginal style of a joint grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKind {
    /// Scatter cloud with KDE marginals
    Scatter,
    /// Density contours with KDE marginals
    Kde,
}

/// What the rendering collaborator should draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FigureKind {
    /// Per-class line plot over a numeric x axis
    Line,
    /// Per-class distribution boxes
    Box,
    /// x/y point cloud per class
    Scatter,
    /// Scatter or KDE with marginal distributions
    Joint(JointKind),
    /// One bar per class
    Bar,
}

/// One plotted group: a labeled, colored point/value set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    /// Group label (class, usually)
    pub label: String,
    /// Hex color assigned from the palette
    pub color: String,
    /// x values (empty for boxes and bars)
    pub x: Vec<f64>,
    /// y values
    pub y: Vec<f64>,
}

/// Finished figure specification handed to the rendering collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    /// Figure family
    pub kind: FigureKind,
    /// File-name tag (no path, no extension; export policy is the renderer's)
    pub name: String,
    /// Optional title annotation
    pub title: Option<String>,
    /// x axis label
    pub x_label: String,
    /// y axis label
    pub y_label: String,
    /// Whether to draw the identity reference line (scatter/joint only)
    pub identity_line: bool,
    /// Plotted groups, in display order
    pub series: Vec<Series>,
}

/// Rendering collaborator seam.
///
/// Implementations draw and export; the orchestration layer only builds
/// [`Figure`] values.
pub trait Renderer {
    /// Draw one figure.
    ///
    /// # Errors
    ///
    /// Implementation-defined (export failures and the like).
    fn render(&mut self, figure: &Figure) -> Result<()>;
}

/// Test double that records every figure it is asked to draw.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    figures: Vec<Figure>,
}

impl RecordingRenderer {
    /// Create an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            figures: Vec::new(),
        }
    }

    /// Figures rendered so far, in order.
    #[must_use]
    pub fn figures(&self) -> &[Figure] {
        &self.figures
    }
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}

/// Assign palette colors to classes by canonical position.
fn class_colors(classes: &[String]) -> Vec<String> {
    classes
        .iter()
        .enumerate()
        .map(|(i, _)| CLASS_PALETTE[i % CLASS_PALETTE.len()].to_string())
        .collect()
}

/// Palette for an explicit display order: each label keeps the color of its
/// canonical position, so a reordered figure stays color-consistent with the
/// rest of the set.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when the order names a class absent from
/// the table.
fn palette_for_order(canonical: &[String], order: &[String]) -> Result<Vec<String>> {
    order
        .iter()
        .map(|label| {
            canonical
                .iter()
                .position(|c| c == label)
                .map(|i| CLASS_PALETTE[i % CLASS_PALETTE.len()].to_string())
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "Display order names unknown class '{label}'"
                    ))
                })
        })
        .collect()
}

fn apply_subset(table: &ScoreTable, include_alpha: Option<&[f64]>) -> ScoreTable {
    include_alpha.map_or_else(|| table.clone(), |grid| table.filter_alpha(grid))
}

/// Per-class score-vs-alpha line figure.
///
/// When `annotate_auc` is set the title carries the summed per-class area
/// under the curve over the supplied grid — which requires a grid and a
/// table already averaged to one value per (class, alpha).
///
/// # Errors
///
/// Propagates normalization errors; AUC annotation errors when its shape
/// requirements are unmet (never silently skipped).
pub fn line_scores_vs_alpha(
    table: &ScoreTable,
    metric: Metric,
    include_alpha: Option<&[f64]>,
    options: &NormalizeOptions,
    annotate_auc: bool,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let mut table = apply_subset(table, include_alpha);
    normalize(&mut table, metric, options)?;

    let title = if annotate_auc {
        let grid = include_alpha.ok_or_else(|| {
            Error::InvalidInput("AUC annotation needs an explicit alpha grid".to_string())
        })?;
        let aucs = class_auc(&table, metric, grid)?;
        let total: f64 = aucs.iter().map(|a| a.auc).sum();
        Some(format!("AUC = {total:.3}"))
    } else {
        None
    };

    let classes = table.classes();
    let colors = class_colors(&classes);
    let series = classes
        .iter()
        .zip(colors)
        .map(|(class, color)| {
            let rows = table.filter_class(class);
            let (x, y): (Vec<f64>, Vec<f64>) = rows
                .records()
                .iter()
                .filter_map(|r| r.metric(metric).map(|v| (r.alpha(), v)))
                .unzip();
            Series {
                label: class.clone(),
                color,
                x,
                y,
            }
        })
        .collect();

    renderer.render(&Figure {
        kind: FigureKind::Line,
        name: "ln_encoding_vs_alpha".to_string(),
        title,
        x_label: "alpha".to_string(),
        y_label: metric.to_string(),
        identity_line: false,
        series,
    })
}

/// One per-class box figure for every alpha in the (optionally restricted)
/// grid.
///
/// # Errors
///
/// Propagates normalization errors.
pub fn box_scores_per_alpha(
    table: &ScoreTable,
    metric: Metric,
    include_alpha: Option<&[f64]>,
    options: &NormalizeOptions,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let mut table = apply_subset(table, include_alpha);
    normalize(&mut table, metric, options)?;

    for alpha in table.alphas() {
        let slice = table.filter_alpha(&[alpha]);
        let classes = slice.classes();
        let colors = class_colors(&classes);
        let series = classes
            .iter()
            .zip(colors)
            .map(|(class, color)| Series {
                label: class.clone(),
                color,
                x: Vec::new(),
                y: slice.filter_class(class).metric_values(metric),
            })
            .collect();

        renderer.render(&Figure {
            kind: FigureKind::Box,
            name: format!("bx_enc_{alpha}"),
            title: Some(format!("alpha = {alpha}")),
            x_label: "class".to_string(),
            y_label: metric.to_string(),
            identity_line: false,
            series,
        })?;
    }
    Ok(())
}

/// Per-class box figure of one coding direction, averaged across alpha.
///
/// # Errors
///
/// Propagates normalization errors; rejects display orders naming unknown
/// classes.
pub fn box_scores(
    table: &ScoreTable,
    metric: Metric,
    order: Option<&[String]>,
    options: &NormalizeOptions,
    tag: &str,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let mut table = table.clone();
    normalize(&mut table, metric, options)?;

    let canonical = table.classes();
    let (display, colors) = match order {
        Some(order) => (order.to_vec(), palette_for_order(&canonical, order)?),
        None => {
            let colors = class_colors(&canonical);
            (canonical, colors)
        }
    };

    let series = display
        .iter()
        .zip(colors)
        .map(|(class, color)| Series {
            label: class.clone(),
            color,
            x: Vec::new(),
            y: table.filter_class(class).metric_values(metric),
        })
        .collect();

    renderer.render(&Figure {
        kind: FigureKind::Box,
        name: format!("bx_enc_{tag}"),
        title: None,
        x_label: "class".to_string(),
        y_label: metric.to_string(),
        identity_line: false,
        series,
    })
}

/// One encoding-vs-decoding scatter per (class, alpha) pair.
///
/// The two frames are normalized with a JOINT min/max before pairing, so
/// both axes share one scale.
///
/// # Errors
///
/// Propagates normalization and merge errors.
pub fn scatter_encoding_vs_decoding_per_alpha(
    encoding: &ScoreTable,
    decoding: &ScoreTable,
    metric: Metric,
    include_alpha: Option<&[f64]>,
    options: &NormalizeOptions,
    identity_line: bool,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let mut encoding = apply_subset(encoding, include_alpha);
    let mut decoding = apply_subset(decoding, include_alpha);
    normalize_joint(&mut encoding, &mut decoding, metric, options)?;

    let classes = encoding.classes();
    let colors = class_colors(&classes);
    for (class, color) in classes.iter().zip(&colors) {
        for alpha in encoding.alphas() {
            let mut pair = encoding.filter_class(class).filter_alpha(&[alpha]);
            pair.extend(decoding.filter_class(class).filter_alpha(&[alpha]));
            let merged = merge_scores(&pair)?;
            debug!(class = %class, alpha, rows = merged.len(), "paired scatter frame");

            renderer.render(&Figure {
                kind: FigureKind::Scatter,
                name: format!("sctt_enc_vs_dec_{class}_{alpha}"),
                title: Some(format!("alpha = {alpha}")),
                x_label: format!("decoding {metric}"),
                y_label: format!("encoding {metric}"),
                identity_line,
                series: vec![Series {
                    label: class.clone(),
                    color: color.clone(),
                    x: merged.column(Channel::Decoding, metric),
                    y: merged.column(Channel::Encoding, metric),
                }],
            })?;
        }
    }
    Ok(())
}

/// Pooled encoding-vs-decoding scatter across all alphas, one series per
/// class, on jointly normalized merged columns.
///
/// # Errors
///
/// Propagates merge and normalization errors.
pub fn scatter_encoding_vs_decoding(
    table: &ScoreTable,
    metric: Metric,
    options: &NormalizeOptions,
    tag: &str,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let merged = merged_normalized(table, metric, options)?;
    renderer.render(&scatter_figure(
        &merged,
        metric,
        FigureKind::Scatter,
        format!("sctt_enc_vs_dec_{tag}"),
        None,
        false,
    ))
}

/// Joint-grid encoding-vs-decoding figure with marginal distributions.
///
/// # Errors
///
/// Propagates merge and normalization errors; rejects hue orders naming
/// unknown classes.
pub fn joint_encoding_vs_decoding(
    table: &ScoreTable,
    metric: Metric,
    options: &NormalizeOptions,
    kind: JointKind,
    hue_order: Option<&[String]>,
    identity_line: bool,
    tag: &str,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let merged = merged_normalized(table, metric, options)?;
    let mut figure = scatter_figure(
        &merged,
        metric,
        FigureKind::Joint(kind),
        format!("jnt_enc_vs_dec_{tag}"),
        None,
        identity_line,
    );

    if let Some(order) = hue_order {
        let canonical = merged.classes();
        let colors = palette_for_order(&canonical, order)?;
        figure.series = order
            .iter()
            .zip(colors)
            .map(|(class, color)| Series {
                label: class.clone(),
                color,
                x: merged.class_column(class, Channel::Decoding, metric),
                y: merged.class_column(class, Channel::Encoding, metric),
            })
            .collect();
    }

    renderer.render(&figure)
}

/// Per-class box figure of the coding (difference) scores.
///
/// The difference column is recomputed after scaling, so boxes show the
/// difference of the *normalized* directions.
///
/// # Errors
///
/// Propagates merge and normalization errors; rejects display orders naming
/// unknown classes.
pub fn box_coding_scores(
    table: &ScoreTable,
    metric: Metric,
    order: Option<&[String]>,
    options: &NormalizeOptions,
    tag: &str,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let merged = merged_normalized(table, metric, options)?;

    let canonical = merged.classes();
    let (display, colors) = match order {
        Some(order) => (order.to_vec(), palette_for_order(&canonical, order)?),
        None => {
            let colors = class_colors(&canonical);
            (canonical, colors)
        }
    };

    let series = display
        .iter()
        .zip(colors)
        .map(|(class, color)| Series {
            label: class.clone(),
            color,
            x: Vec::new(),
            y: merged.class_column(class, Channel::Coding, metric),
        })
        .collect();

    renderer.render(&Figure {
        kind: FigureKind::Box,
        name: format!("bx_coding_scores_{tag}"),
        title: None,
        x_label: "class".to_string(),
        y_label: format!("coding {metric}"),
        identity_line: false,
        series,
    })
}

/// Per-class Cohen's d bar figure.
///
/// # Errors
///
/// Propagates effect-size errors; rejects display orders naming unknown
/// classes.
pub fn bar_effect_size(
    table: &MergedTable,
    metric: Metric,
    kind: TestKind,
    options: &NormalizeOptions,
    order: Option<&[String]>,
    tag: &str,
    renderer: &mut dyn Renderer,
) -> Result<()> {
    let effects = effect_size(table, metric, kind, options)?;
    let canonical: Vec<String> = effects.iter().map(|e| e.class.clone()).collect();

    let (display, colors) = match order {
        Some(order) => (order.to_vec(), palette_for_order(&canonical, order)?),
        None => {
            let colors = class_colors(&canonical);
            (canonical.clone(), colors)
        }
    };

    let series = display
        .iter()
        .zip(colors)
        .map(|(class, color)| {
            let d = effects
                .iter()
                .find(|e| &e.class == class)
                .map_or(f64::NAN, |e| e.cohen_d);
            Series {
                label: class.clone(),
                color,
                x: Vec::new(),
                y: vec![d],
            }
        })
        .collect();

    renderer.render(&Figure {
        kind: FigureKind::Bar,
        name: format!("bar_effect_size_{tag}"),
        title: None,
        x_label: "class".to_string(),
        y_label: "effect size - coding scores".to_string(),
        identity_line: false,
        series,
    })
}

/// Merge a long table and normalize its direction columns jointly.
fn merged_normalized(
    table: &ScoreTable,
    metric: Metric,
    options: &NormalizeOptions,
) -> Result<MergedTable> {
    let mut merged = merge_scores(table)?;
    normalize_merged(&mut merged, metric, options)?;
    Ok(merged)
}

/// Build the per-class decoding-x / encoding-y figure shared by the scatter
/// and joint families.
fn scatter_figure(
    merged: &MergedTable,
    metric: Metric,
    kind: FigureKind,
    name: String,
    title: Option<String>,
    identity_line: bool,
) -> Figure {
    let classes = merged.classes();
    let colors = class_colors(&classes);
    let series = classes
        .iter()
        .zip(colors)
        .map(|(class, color)| Series {
            label: class.clone(),
            color,
            x: merged.class_column(class, Channel::Decoding, metric),
            y: merged.class_column(class, Channel::Encoding, metric),
        })
        .collect();

    Figure {
        kind,
        name,
        title,
        x_label: format!("decoding {metric}"),
        y_label: format!("encoding {metric}"),
        identity_line,
        series,
    }
}

/// Direction accent color for single-direction figures.
#[must_use]
pub const fn coding_color(coding: Coding) -> &'static str {
    match coding {
        Coding::Encoding => ENCODING_COLOR,
        Coding::Decoding => DECODING_COLOR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::ScoreRecord;

    /// Two classes, two alphas, three samples, both directions.
    fn fixture() -> ScoreTable {
        let mut table = ScoreTable::new();
        for class in ["VIS", "DMN"] {
            for alpha in [0.5, 1.0] {
                for i in 0..3 {
                    let base = f64::from(i) * 0.1 + alpha;
                    table.push(
                        ScoreRecord::builder(format!("s{i}"), class, Coding::Encoding, alpha)
                            .performance(base + 0.2)
                            .capacity(base * 2.0)
                            .n_nodes(64.0)
                            .analysis("reliability")
                            .build(),
                    );
                    table.push(
                        ScoreRecord::builder(format!("s{i}"), class, Coding::Decoding, alpha)
                            .performance(base)
                            .capacity(base * 1.5)
                            .n_nodes(64.0)
                            .analysis("reliability")
                            .build(),
                    );
                }
            }
        }
        table
    }

    #[test]
    fn test_line_figure_series_per_class() {
        let mut renderer = RecordingRenderer::new();
        line_scores_vs_alpha(
            &fixture().filter_coding(Coding::Encoding),
            Metric::Performance,
            None,
            &NormalizeOptions::scaled(),
            false,
            &mut renderer,
        )
        .unwrap();

        let figures = renderer.figures();
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].kind, FigureKind::Line);
        assert_eq!(figures[0].series.len(), 2);
        assert_eq!(figures[0].series[0].label, "VIS");
        // scaled values live in [0, 1]
        for series in &figures[0].series {
            for &v in &series.y {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_auc_annotation_requires_grid() {
        let err = line_scores_vs_alpha(
            &fixture(),
            Metric::Performance,
            None,
            &NormalizeOptions::raw(),
            true,
            &mut RecordingRenderer::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_box_per_alpha_emits_one_figure_each() {
        let mut renderer = RecordingRenderer::new();
        box_scores_per_alpha(
            &fixture().filter_coding(Coding::Encoding),
            Metric::Performance,
            None,
            &NormalizeOptions::raw(),
            &mut renderer,
        )
        .unwrap();
        assert_eq!(renderer.figures().len(), 2);
        assert!(renderer.figures()[0].name.starts_with("bx_enc_"));
    }

    #[test]
    fn test_box_scores_explicit_order_realigns_palette() {
        let mut renderer = RecordingRenderer::new();
        let order = vec!["DMN".to_string(), "VIS".to_string()];
        box_scores(
            &fixture().filter_coding(Coding::Encoding),
            Metric::Performance,
            Some(&order),
            &NormalizeOptions::raw(),
            "reliability",
            &mut renderer,
        )
        .unwrap();

        let figure = &renderer.figures()[0];
        // canonical order is [VIS, DMN]; DMN displayed first keeps color #2
        assert_eq!(figure.series[0].label, "DMN");
        assert_eq!(figure.series[0].color, CLASS_PALETTE[1]);
        assert_eq!(figure.series[1].color, CLASS_PALETTE[0]);
    }

    #[test]
    fn test_box_scores_unknown_order_rejected() {
        let err = box_scores(
            &fixture(),
            Metric::Performance,
            Some(&["XYZ".to_string()]),
            &NormalizeOptions::raw(),
            "t",
            &mut RecordingRenderer::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_scatter_per_alpha_figure_count() {
        let table = fixture();
        let mut renderer = RecordingRenderer::new();
        scatter_encoding_vs_decoding_per_alpha(
            &table.filter_coding(Coding::Encoding),
            &table.filter_coding(Coding::Decoding),
            Metric::Performance,
            None,
            &NormalizeOptions::scaled(),
            true,
            &mut renderer,
        )
        .unwrap();

        // 2 classes × 2 alphas
        assert_eq!(renderer.figures().len(), 4);
        for figure in renderer.figures() {
            assert!(figure.identity_line);
            assert_eq!(figure.series.len(), 1);
            assert_eq!(figure.series[0].x.len(), 3);
        }
    }

    #[test]
    fn test_pooled_scatter_axes_share_scale() {
        let mut renderer = RecordingRenderer::new();
        scatter_encoding_vs_decoding(
            &fixture(),
            Metric::Performance,
            &NormalizeOptions::scaled(),
            "reliability",
            &mut renderer,
        )
        .unwrap();

        let figure = &renderer.figures()[0];
        assert_eq!(figure.kind, FigureKind::Scatter);
        let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
        for series in &figure.series {
            for &v in series.x.iter().chain(&series.y) {
                min = min.min(v);
                max = max.max(v);
            }
        }
        // joint scaling pins the pooled extent to exactly [0, 1]
        assert!((min - 0.0).abs() < 1e-12 && (max - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_joint_figure_hue_order() {
        let mut renderer = RecordingRenderer::new();
        let order = vec!["DMN".to_string(), "VIS".to_string()];
        joint_encoding_vs_decoding(
            &fixture(),
            Metric::Capacity,
            &NormalizeOptions::scaled(),
            JointKind::Kde,
            Some(&order),
            true,
            "regime",
            &mut renderer,
        )
        .unwrap();

        let figure = &renderer.figures()[0];
        assert_eq!(figure.kind, FigureKind::Joint(JointKind::Kde));
        assert_eq!(figure.series[0].label, "DMN");
    }

    #[test]
    fn test_box_coding_scores_difference_of_scaled() {
        let mut renderer = RecordingRenderer::new();
        box_coding_scores(
            &fixture(),
            Metric::Performance,
            None,
            &NormalizeOptions::scaled(),
            "reliability",
            &mut renderer,
        )
        .unwrap();

        let figure = &renderer.figures()[0];
        assert_eq!(figure.name, "bx_coding_scores_reliability");
        // encoding leads decoding by a constant 0.2 raw; after joint scaling
        // the difference is strictly positive and bounded by the unit range
        for series in &figure.series {
            for &v in &series.y {
                assert!(v > 0.0 && v < 1.0);
            }
        }
    }

    #[test]
    fn test_bar_effect_size_positive_for_dominant_encoding() {
        let merged = merge_scores(&fixture()).unwrap();
        let mut renderer = RecordingRenderer::new();
        bar_effect_size(
            &merged,
            Metric::Performance,
            TestKind::Paired,
            &NormalizeOptions::raw(),
            None,
            "reliability",
            &mut renderer,
        )
        .unwrap();

        let figure = &renderer.figures()[0];
        assert_eq!(figure.kind, FigureKind::Bar);
        for series in &figure.series {
            assert!(series.y[0] > 0.0, "{} d = {}", series.label, series.y[0]);
        }
    }
}
