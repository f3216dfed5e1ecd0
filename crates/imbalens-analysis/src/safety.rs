//! Neighbourhood safety levels and minority example types
//!
//! Every example of a batch gets a *safe level*: the fraction of its `k`
//! nearest neighbours (within the same batch) that share its class. Minority
//! examples are then typed by that level:
//!
//! | safe level `s`        | type         | with `k = 5`        |
//! |-----------------------|--------------|---------------------|
//! | `s > 0.7`             | `Safe`       | 4 or 5 same-class   |
//! | `0.3 < s <= 0.7`      | `Borderline` | 2 or 3 same-class   |
//! | `0.1 < s <= 0.3`      | `Rare`       | 1 same-class        |
//! | `s <= 0.1`            | `Outlier`    | none                |
//!
//! ```
//! use imbalens_analysis::safety::{MinorityType, TypeThresholds};
//!
//! let thresholds = TypeThresholds::default();
//! assert_eq!(thresholds.classify(0.8), MinorityType::Safe);
//! assert_eq!(thresholds.classify(0.0), MinorityType::Outlier);
//! ```

use serde::Serialize;

use crate::neighbors::KdTree;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SafetyError {
    #[display("{points} examples cannot provide {k} neighbours each")]
    TooFewPoints { points: usize, k: usize },
    #[display("{points} feature rows but {labels} labels")]
    LengthMismatch { points: usize, labels: usize },
}

/// Type of a minority example by neighbourhood composition
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, derive_more::IsVariant,
)]
pub enum MinorityType {
    Safe,
    Borderline,
    Rare,
    Outlier,
}

impl MinorityType {
    pub const ALL: [Self; 4] = [Self::Safe, Self::Borderline, Self::Rare, Self::Outlier];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Borderline => "Borderline",
            Self::Rare => "Rare",
            Self::Outlier => "Outlier",
        }
    }
}

/// Lower bounds (exclusive) of the safe level for each type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TypeThresholds {
    pub safe: f64,
    pub borderline: f64,
    pub rare: f64,
}

impl Default for TypeThresholds {
    fn default() -> Self {
        Self {
            safe: 0.7,
            borderline: 0.3,
            rare: 0.1,
        }
    }
}

impl TypeThresholds {
    #[must_use]
    pub fn classify(&self, safe_level: f64) -> MinorityType {
        if safe_level > self.safe {
            MinorityType::Safe
        } else if safe_level > self.borderline {
            MinorityType::Borderline
        } else if safe_level > self.rare {
            MinorityType::Rare
        } else {
            MinorityType::Outlier
        }
    }

    /// Thresholds must be strictly decreasing and non-negative
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.safe > self.borderline && self.borderline > self.rare && self.rare >= 0.0
    }
}

/// Number of minority examples of each type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub safe: usize,
    pub borderline: usize,
    pub rare: usize,
    pub outlier: usize,
}

impl TypeCounts {
    pub fn add(&mut self, ty: MinorityType) {
        *self.get_mut(ty) += 1;
    }

    #[must_use]
    pub fn get(&self, ty: MinorityType) -> usize {
        match ty {
            MinorityType::Safe => self.safe,
            MinorityType::Borderline => self.borderline,
            MinorityType::Rare => self.rare,
            MinorityType::Outlier => self.outlier,
        }
    }

    fn get_mut(&mut self, ty: MinorityType) -> &mut usize {
        match ty {
            MinorityType::Safe => &mut self.safe,
            MinorityType::Borderline => &mut self.borderline,
            MinorityType::Rare => &mut self.rare,
            MinorityType::Outlier => &mut self.outlier,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.safe + self.borderline + self.rare + self.outlier
    }

    /// Counts divided by `total`; all zero when `total` is zero
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn ratios(&self, total: usize) -> TypeRatios {
        let ratio = |count: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64
            }
        };
        TypeRatios {
            safe: ratio(self.safe),
            borderline: ratio(self.borderline),
            rare: ratio(self.rare),
            outlier: ratio(self.outlier),
        }
    }
}

/// Share of minority examples of each type
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TypeRatios {
    pub safe: f64,
    pub borderline: f64,
    pub rare: f64,
    pub outlier: f64,
}

impl TypeRatios {
    #[must_use]
    pub fn get(&self, ty: MinorityType) -> f64 {
        match ty {
            MinorityType::Safe => self.safe,
            MinorityType::Borderline => self.borderline,
            MinorityType::Rare => self.rare,
            MinorityType::Outlier => self.outlier,
        }
    }
}

/// Safe level of every example: the fraction of its `k` nearest neighbours
/// with the same label.
pub fn safe_levels(points: &[Vec<f64>], labels: &[usize], k: usize) -> Result<Vec<f64>, SafetyError> {
    if points.len() != labels.len() {
        return Err(SafetyError::LengthMismatch {
            points: points.len(),
            labels: labels.len(),
        });
    }
    if k == 0 || points.len() <= k {
        return Err(SafetyError::TooFewPoints {
            points: points.len(),
            k,
        });
    }

    let tree = KdTree::build(points);
    #[expect(clippy::cast_precision_loss)]
    let levels = (0..points.len())
        .map(|i| {
            let same = tree
                .nearest(i, k)
                .into_iter()
                .filter(|&j| labels[j] == labels[i])
                .count();
            same as f64 / k as f64
        })
        .collect();
    Ok(levels)
}

/// Type counts of the examples labeled `minority`, judged against the whole
/// batch.
pub fn count_minority_types(
    points: &[Vec<f64>],
    labels: &[usize],
    minority: usize,
    k: usize,
    thresholds: &TypeThresholds,
) -> Result<TypeCounts, SafetyError> {
    let levels = safe_levels(points, labels, k)?;
    let mut counts = TypeCounts::default();
    for (level, _) in levels
        .into_iter()
        .zip(labels)
        .filter(|&(_, &label)| label == minority)
    {
        counts.add(thresholds.classify(level));
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries_with_five_neighbours() {
        let t = TypeThresholds::default();
        let types = (0..=5)
            .map(|same| t.classify(f64::from(same) / 5.0))
            .collect::<Vec<_>>();
        assert_eq!(
            types,
            vec![
                MinorityType::Outlier,
                MinorityType::Rare,
                MinorityType::Borderline,
                MinorityType::Borderline,
                MinorityType::Safe,
                MinorityType::Safe,
            ]
        );
        // exact threshold values fall into the lower type
        assert_eq!(t.classify(0.7), MinorityType::Borderline);
        assert_eq!(t.classify(0.3), MinorityType::Rare);
        assert_eq!(t.classify(0.1), MinorityType::Outlier);
    }

    #[test]
    fn test_thresholds_validation() {
        assert!(TypeThresholds::default().is_valid());
        let bad = TypeThresholds {
            safe: 0.3,
            borderline: 0.7,
            rare: 0.1,
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_safe_levels_on_two_groups() {
        // two tight groups far apart, each of a single class
        let mut points = Vec::new();
        let mut labels = Vec::new();
        for i in 0..6 {
            points.push(vec![f64::from(i) * 0.1, 0.0]);
            labels.push(0);
        }
        for i in 0..6 {
            points.push(vec![100.0 + f64::from(i) * 0.1, 0.0]);
            labels.push(1);
        }
        let levels = safe_levels(&points, &labels, 5).unwrap();
        assert!(levels.iter().all(|&l| (l - 1.0).abs() < f64::EPSILON));
    }

    #[test]
    fn test_count_minority_types() {
        // majority grid with minority points planted at varying depths
        let mut points = Vec::new();
        let mut labels = Vec::new();
        // a safe minority cluster far away
        for i in 0..6 {
            points.push(vec![1000.0 + f64::from(i), 0.0]);
            labels.push(1);
        }
        // majority block
        for x in 0..5 {
            for y in 0..5 {
                points.push(vec![f64::from(x), f64::from(y)]);
                labels.push(0);
            }
        }
        // a lone minority point inside the majority block
        points.push(vec![2.0, 2.5]);
        labels.push(1);

        let counts =
            count_minority_types(&points, &labels, 1, 5, &TypeThresholds::default()).unwrap();
        assert_eq!(counts.safe, 6);
        assert_eq!(counts.outlier, 1);
        assert_eq!(counts.total(), 7);

        let ratios = counts.ratios(7);
        assert!((ratios.safe - 6.0 / 7.0).abs() < 1e-12);
        assert!((ratios.outlier - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(ratios.rare, 0.0);
    }

    #[test]
    fn test_ratios_of_zero_total() {
        let counts = TypeCounts::default();
        assert_eq!(counts.ratios(0), TypeRatios::default());
    }

    #[test]
    fn test_too_few_points() {
        let points = vec![vec![0.0]; 5];
        let labels = vec![0; 5];
        assert_eq!(
            safe_levels(&points, &labels, 5),
            Err(SafetyError::TooFewPoints { points: 5, k: 5 })
        );
    }
}
