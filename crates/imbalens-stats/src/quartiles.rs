/// Quartiles of a dataset, computed with the median-of-halves method.
///
/// The second quartile is the median of all values. The first and third
/// quartiles are the medians of the lower and upper halves of the sorted data;
/// for an odd number of values the overall median belongs to neither half.
///
/// # Examples
///
/// ```
/// use imbalens_stats::quartiles::Quartiles;
///
/// let q = Quartiles::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
/// assert_eq!(q.q1, 2.5);
/// assert_eq!(q.q2, 4.5);
/// assert_eq!(q.q3, 6.5);
/// assert_eq!(q.iqr(), 4.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    /// First quartile (25th percentile).
    pub q1: f64,
    /// Second quartile (median).
    pub q2: f64,
    /// Third quartile (75th percentile).
    pub q3: f64,
}

impl Quartiles {
    /// Computes quartiles from unsorted values.
    ///
    /// Returns `None` if `values` is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use imbalens_stats::quartiles::Quartiles;
    ///
    /// let q = Quartiles::new(&[7.0, 1.0, 5.0, 3.0, 9.0]).unwrap();
    /// assert_eq!((q.q1, q.q2, q.q3), (2.0, 5.0, 8.0));
    /// ```
    #[must_use]
    pub fn new(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self::from_sorted(&sorted)
    }

    /// Computes quartiles from sorted values.
    ///
    /// A single value is its own first, second, and third quartile.
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let q2 = median(sorted_values)?;
        if sorted_values.len() == 1 {
            return Some(Self { q1: q2, q2, q3: q2 });
        }

        let mid = sorted_values.len() / 2;
        let lower = &sorted_values[..mid];
        let upper = if sorted_values.len() % 2 == 0 {
            &sorted_values[mid..]
        } else {
            &sorted_values[mid + 1..]
        };

        Some(Self {
            q1: median(lower)?,
            q2,
            q3: median(upper)?,
        })
    }

    /// Interquartile range (`q3 - q1`).
    #[must_use]
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Computes the median of sorted values.
///
/// For an even number of values the result is the mean of the two middle
/// values. Returns `None` if the input is empty.
///
/// # Examples
///
/// ```
/// use imbalens_stats::quartiles::median;
///
/// assert_eq!(median(&[1.0, 2.0, 3.0]), Some(2.0));
/// assert_eq!(median(&[1.0, 2.0, 3.0, 10.0]), Some(2.5));
/// assert_eq!(median(&[]), None);
/// ```
#[must_use]
pub fn median(sorted_values: &[f64]) -> Option<f64> {
    let n = sorted_values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    if n % 2 == 1 {
        Some(sorted_values[mid])
    } else {
        Some(f64::midpoint(sorted_values[mid - 1], sorted_values[mid]))
    }
}
