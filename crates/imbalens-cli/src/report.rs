use std::fmt;

use imbalens_analysis::{safety::MinorityType, stream::StreamAnalysis};
use imbalens_stats::summary::SeriesSummary;

use crate::latex::LatexRow;

const MISSING: &str = "n/a";

/// Plain-text analysis report
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub file_name: &'a str,
    pub analysis: &'a StreamAnalysis,
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.analysis;
        writeln!(f, "File Name: {}", self.file_name)?;
        writeln!(f, "BLOCK_SIZE: {}", analysis.config.block_size)?;
        writeln!(f, "min_index: {}", analysis.config.minority_index)?;
        writeln!(f, "Total number of examples: {}", analysis.num_examples)?;

        for class in 0..analysis.class_names.len() {
            writeln!(f)?;
            writeln!(f, "Class {class} ratio:")?;
            writeln!(f, "{}", Stats::ratios(&analysis.class_ratio_series(class)))?;
        }

        writeln!(f)?;
        writeln!(f, "Estimated minority clusters:")?;
        writeln!(f, "{}", Stats::counts(&analysis.counted_clusters()))?;

        for ty in MinorityType::ALL {
            writeln!(f)?;
            writeln!(f, "{} ratio:", ty.name())?;
            writeln!(f, "{}", Stats::ratios(&analysis.counted_type_ratios(ty)))?;
        }

        writeln!(f)?;
        writeln!(f, "Latex table row:")?;
        writeln!(f, "{}", LatexRow(analysis))?;

        writeln!(f)?;
        writeln!(f, "plot_xticks:")?;
        write!(f, "{:?}", analysis.xticks())
    }
}

/// Three-line summary of a series
struct Stats<'a> {
    values: &'a [f64],
    /// Whole-number series print exact values without a fractional part
    counts: bool,
}

impl<'a> Stats<'a> {
    fn ratios(values: &'a [f64]) -> Self {
        Self {
            values,
            counts: false,
        }
    }

    fn counts(values: &'a [f64]) -> Self {
        Self {
            values,
            counts: true,
        }
    }

    /// For count series, `exact` marks values that stay integers (extremes,
    /// whole means, medians of odd-length lists); all others are fractional.
    fn number(&self, value: f64, exact: bool) -> String {
        if self.counts && exact {
            format!("{value:.0}")
        } else {
            format_number(value)
        }
    }
}

impl fmt::Display for Stats<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(SeriesSummary { stats, quartiles }) = SeriesSummary::new(self.values) else {
            return write!(f, "{MISSING}");
        };
        let std_dev = stats
            .std_dev
            .map_or_else(|| MISSING.to_owned(), format_number);
        let half = stats.count / 2;
        let exact_median = stats.count % 2 == 1;
        let exact_quartiles = stats.count == 1 || half % 2 == 1;

        writeln!(
            f,
            "{} - {}",
            self.number(stats.min, true),
            self.number(stats.max, true)
        )?;
        writeln!(
            f,
            "Mean: {} | Std. Dev.: {std_dev}",
            self.number(stats.mean, stats.mean.fract() == 0.0)
        )?;
        write!(
            f,
            "q1, q2, q3: {}, {}, {} | iqr: {}",
            self.number(quartiles.q1, exact_quartiles),
            self.number(quartiles.q2, exact_median),
            self.number(quartiles.q3, exact_quartiles),
            self.number(quartiles.iqr(), exact_quartiles)
        )
    }
}

/// `value` rounded to three decimals from its exact binary value (ties to
/// even), trailing zeros trimmed down to one fractional digit (`1.0`, `0.25`).
fn format_number(value: f64) -> String {
    let mut text = format!("{value:.3}");
    let trimmed = text.trim_end_matches('0').len();
    text.truncate(trimmed);
    if text.ends_with('.') {
        text.push('0');
    }
    if text == "-0.0" {
        text.remove(0);
    }
    text
}
