use std::fmt;

use imbalens_analysis::{safety::MinorityType, stream::StreamAnalysis};
use imbalens_stats::descriptive::DescriptiveStats;

const EMPTY_CELL: &str = "-";

/// One row of the results table:
/// `examples & batches (uncounted) & clusters & minority ratio & safe & borderline & rare & outlier`
#[derive(Debug, Clone, Copy)]
pub struct LatexRow<'a>(pub &'a StreamAnalysis);

impl fmt::Display for LatexRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let analysis = self.0;
        write!(
            f,
            "{} & {} ({}) & {}",
            analysis.num_examples,
            analysis.num_batches(),
            analysis.uncounted_batches(),
            count_cell(&analysis.counted_clusters())
        )?;
        write!(f, " & {}", ratio_cell(&analysis.minority_ratio_series()))?;
        for ty in MinorityType::ALL {
            write!(f, " & {}", ratio_cell(&analysis.counted_type_ratios(ty)))?;
        }
        Ok(())
    }
}

/// `min-max (median)`
fn count_cell(values: &[f64]) -> String {
    let Some(stats) = DescriptiveStats::new(values.iter().copied()) else {
        return EMPTY_CELL.to_owned();
    };
    format!(
        "{}-{} ({})",
        stats.min.round_ties_even(),
        stats.max.round_ties_even(),
        stats.median.round_ties_even()
    )
}

/// `min\%-max\% (median\%)` of the values in percent
fn ratio_cell(values: &[f64]) -> String {
    let Some(stats) = DescriptiveStats::new(values.iter().map(|v| v * 100.0)) else {
        return EMPTY_CELL.to_owned();
    };
    format!(
        "{}\\%-{}\\% ({}\\%)",
        stats.min.round_ties_even(),
        stats.max.round_ties_even(),
        stats.median.round_ties_even()
    )
}
