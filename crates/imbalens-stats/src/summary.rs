use crate::{descriptive::DescriptiveStats, quartiles::Quartiles};

/// Summary of a per-batch series combining descriptive statistics and quartiles.
///
/// This is the unit reported for every series in the analysis report
/// (class ratios, cluster counts, minority type ratios).
///
/// # Examples
///
/// ```
/// use imbalens_stats::summary::SeriesSummary;
///
/// let summary = SeriesSummary::new(&[0.1, 0.2, 0.3, 0.4]).unwrap();
/// assert_eq!(summary.stats.min, 0.1);
/// assert_eq!(summary.quartiles.q2, 0.25);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    /// Basic descriptive statistics for the series.
    pub stats: DescriptiveStats,
    /// Median-of-halves quartiles for the series.
    pub quartiles: Quartiles,
}

impl SeriesSummary {
    /// Summarizes unsorted values.
    ///
    /// Returns `None` if `values` is empty.
    #[must_use]
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    /// Summarizes pre-sorted values.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        let stats = DescriptiveStats::from_sorted(sorted_values)?;
        let quartiles = Quartiles::from_sorted(sorted_values)?;
        Some(Self { stats, quartiles })
    }
}
