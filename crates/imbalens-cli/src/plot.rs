//! SVG line charts of per-batch series over time steps

use std::path::{Path, PathBuf};

use anyhow::Context;
use imbalens_analysis::{safety::MinorityType, stream::StreamAnalysis};
use plotters::prelude::*;

const DEFAULT_FONT: FontFamily = FontFamily::SansSerif;
const SIZE: (u32, u32) = (960, 540);
const LINE_WIDTH: u32 = 3;
const X_DESC: &str = "TimeSteps";

const ORANGE: RGBColor = RGBColor(255, 165, 0);

/// A named line of a chart
struct Line {
    label: Option<&'static str>,
    color: RGBColor,
    points: Vec<(f64, f64)>,
}

/// Paths of the charts written by [`plot_all`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotPaths {
    pub minority_ratios: PathBuf,
    pub num_of_clusters: PathBuf,
    pub minority_type: PathBuf,
}

impl PlotPaths {
    #[must_use]
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            minority_ratios: dir.join(format!("{stem}-minority-ratios.svg")),
            num_of_clusters: dir.join(format!("{stem}-num-of-clusters.svg")),
            minority_type: dir.join(format!("{stem}-minority-type.svg")),
        }
    }
}

/// Draw the minority ratio, sub-cluster and minority type charts into `dir`.
///
/// Returns `None` without writing anything when the analysis has no batches.
pub fn plot_all(
    analysis: &StreamAnalysis,
    dir: &Path,
    stem: &str,
) -> anyhow::Result<Option<PlotPaths>> {
    let xticks = analysis.xticks();
    let Some(&x_max) = xticks.last() else {
        log::warn!("no batches to plot");
        return Ok(None);
    };
    #[expect(clippy::cast_precision_loss)]
    let x_max = x_max as f64;

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create plot directory: {}", dir.display()))?;
    let paths = PlotPaths::new(dir, stem);

    let percent = |values: Vec<f64>| values.into_iter().map(|v| v * 100.0).collect::<Vec<_>>();

    line_chart(
        &paths.minority_ratios,
        "Minority Class Ratio (%)",
        x_max,
        0.0..100.0,
        vec![Line {
            label: None,
            color: RED,
            points: zip_xticks(&xticks, percent(analysis.minority_ratio_series())),
        }],
    )?;

    let clusters = analysis.cluster_series();
    let cluster_max = clusters.iter().copied().fold(0.0, f64::max);
    line_chart(
        &paths.num_of_clusters,
        "#Minority Class Sub-Clusters",
        x_max,
        0.0..cluster_max + 1.0,
        vec![Line {
            label: None,
            color: RED,
            points: zip_xticks(&xticks, clusters),
        }],
    )?;

    let type_lines = MinorityType::ALL
        .into_iter()
        .map(|ty| Line {
            label: Some(ty.name()),
            color: type_color(ty),
            points: zip_xticks(&xticks, percent(analysis.type_ratio_series(ty))),
        })
        .collect();
    line_chart(
        &paths.minority_type,
        "Minority Example Type (%)",
        x_max,
        0.0..100.0,
        type_lines,
    )?;

    Ok(Some(paths))
}

fn type_color(ty: MinorityType) -> RGBColor {
    match ty {
        MinorityType::Safe => GREEN,
        MinorityType::Borderline => ORANGE,
        MinorityType::Rare => RED,
        MinorityType::Outlier => BLACK,
    }
}

#[expect(clippy::cast_precision_loss)]
fn zip_xticks(xticks: &[usize], values: Vec<f64>) -> Vec<(f64, f64)> {
    xticks.iter().map(|&x| x as f64).zip(values).collect()
}

fn line_chart(
    path: &Path,
    y_desc: &str,
    x_max: f64,
    y_range: std::ops::Range<f64>,
    lines: Vec<Line>,
) -> anyhow::Result<()> {
    let draw = || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .margin((5).percent())
            .set_label_area_size(LabelAreaPosition::Left, (6).percent_width().min(80))
            .set_label_area_size(LabelAreaPosition::Bottom, (6).percent_height().min(50))
            .build_cartesian_2d(0.0..x_max, y_range)?;

        chart
            .configure_mesh()
            .x_desc(X_DESC)
            .y_desc(y_desc)
            .label_style((DEFAULT_FONT, 16))
            .axis_desc_style((DEFAULT_FONT, 20))
            .draw()?;

        let has_legend = lines.iter().any(|line| line.label.is_some());
        for line in lines {
            let color = line.color;
            let series =
                chart.draw_series(LineSeries::new(line.points, color.stroke_width(LINE_WIDTH)))?;
            if let Some(label) = line.label {
                series.label(label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH))
                });
            }
        }

        if has_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font((DEFAULT_FONT, 16))
                .draw()?;
        }

        root.present()?;
        Ok(())
    };
    draw()
        .map_err(|e| anyhow::anyhow!(e))
        .with_context(|| format!("Failed to draw chart: {}", path.display()))
}
