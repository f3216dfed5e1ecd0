//! Batch-wise imbalance analysis of a stream
//!
//! [`StreamAnalysis::run`] walks the stream batch by batch and records, for
//! every batch:
//!
//! 1. the ratio of each class in the batch;
//! 2. if the batch holds at least `min_minority` minority examples (a
//!    *counted* batch), the number of minority sub-clusters with at least
//!    `min_cluster_size` members and the share of safe, borderline, rare and
//!    outlier minority examples.
//!
//! Batches with too few minority examples are *uncounted*: they still
//! contribute class ratios, and they appear as zeros in the cluster and type
//! plot series, but they are left out of the cluster and type statistics.

use serde::Serialize;

use crate::{
    batch::{Batch, BatchIter},
    clustering::{self, DEFAULT_SEED},
    dataset::Dataset,
    safety::{self, MinorityType, SafetyError, TypeCounts, TypeRatios, TypeThresholds},
};

/// Neighbourhood size used for safe levels
pub const DEFAULT_NEIGHBORS: usize = 5;
/// Minority examples a batch needs to be analysed
pub const DEFAULT_MIN_MINORITY: usize = 6;
/// Members a sub-cluster needs to be counted
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 6;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("block size must be positive")]
    ZeroBlockSize,
    #[display("number of neighbours must be positive")]
    ZeroNeighbors,
    #[display("minority class index {index} is out of range ({num_classes} classes)")]
    MinorityIndex { index: usize, num_classes: usize },
    #[display("minimum sub-cluster size must be positive")]
    ZeroMinClusterSize,
    #[display(
        "minimum minority count ({min_minority}) must exceed the number of neighbours ({neighbors})"
    )]
    MinMinorityTooSmall {
        min_minority: usize,
        neighbors: usize,
    },
    #[display("type thresholds must satisfy safe > borderline > rare >= 0")]
    Thresholds,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum AnalysisError {
    #[display("invalid configuration: {_0}")]
    Config(ConfigError),
    #[display("batch {batch}: {source}")]
    Safety { batch: usize, source: SafetyError },
}

/// Parameters of a stream analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisConfig {
    /// Examples per batch
    pub block_size: usize,
    /// Index of the minority class in the declared class list
    pub minority_index: usize,
    /// Neighbourhood size `k` for safe levels
    pub neighbors: usize,
    /// Minority examples a batch needs to be counted
    pub min_minority: usize,
    /// Members a minority sub-cluster needs to be counted
    pub min_cluster_size: usize,
    pub thresholds: TypeThresholds,
    /// Seed of the clustering tie-breaking noise
    pub seed: u64,
}

impl AnalysisConfig {
    /// Configuration with default parameters
    #[must_use]
    pub fn new(block_size: usize, minority_index: usize) -> Self {
        Self {
            block_size,
            minority_index,
            neighbors: DEFAULT_NEIGHBORS,
            min_minority: DEFAULT_MIN_MINORITY,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            thresholds: TypeThresholds::default(),
            seed: DEFAULT_SEED,
        }
    }

    pub fn validate(&self, num_classes: usize) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        if self.neighbors == 0 {
            return Err(ConfigError::ZeroNeighbors);
        }
        if self.minority_index >= num_classes {
            return Err(ConfigError::MinorityIndex {
                index: self.minority_index,
                num_classes,
            });
        }
        if self.min_cluster_size == 0 {
            return Err(ConfigError::ZeroMinClusterSize);
        }
        // a counted batch must be able to give every example k neighbours
        if self.min_minority <= self.neighbors {
            return Err(ConfigError::MinMinorityTooSmall {
                min_minority: self.min_minority,
                neighbors: self.neighbors,
            });
        }
        if !self.thresholds.is_valid() {
            return Err(ConfigError::Thresholds);
        }
        Ok(())
    }
}

/// Minority structure of a counted batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MinorityProfile {
    /// Sub-clusters with at least `min_cluster_size` members
    pub clusters: usize,
    pub type_counts: TypeCounts,
    /// `type_counts` divided by the batch's minority count
    pub type_ratios: TypeRatios,
}

/// Statistics of one batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRecord {
    pub id: usize,
    pub start: usize,
    pub end: usize,
    /// Examples of each class, indexed by class
    pub class_counts: Vec<usize>,
    /// `class_counts` divided by the batch length
    pub class_ratios: Vec<f64>,
    pub minority_count: usize,
    /// `None` for uncounted batches
    pub minority: Option<MinorityProfile>,
}

impl BatchRecord {
    #[must_use]
    pub fn is_counted(&self) -> bool {
        self.minority.is_some()
    }
}

/// Per-batch results of a whole stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamAnalysis {
    pub config: AnalysisConfig,
    pub class_names: Vec<String>,
    pub num_examples: usize,
    pub batches: Vec<BatchRecord>,
}

impl StreamAnalysis {
    /// Analyse `dataset` batch by batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use imbalens_analysis::{dataset::Dataset, stream::{AnalysisConfig, StreamAnalysis}};
    ///
    /// let features = (0..40_u32).map(|i| vec![f64::from(i)]).collect::<Vec<_>>();
    /// let labels = (0..40_u32).map(|i| usize::from(i % 4 == 0)).collect::<Vec<_>>();
    /// let dataset = Dataset::new(
    ///     vec!["x".into()],
    ///     vec!["maj".into(), "min".into()],
    ///     features,
    ///     labels,
    /// )
    /// .unwrap();
    ///
    /// let analysis = StreamAnalysis::run(&dataset, AnalysisConfig::new(20, 1)).unwrap();
    /// assert_eq!(analysis.xticks(), vec![20, 40]);
    /// assert_eq!(analysis.class_ratio_series(1), vec![0.25, 0.25]);
    /// ```
    pub fn run(dataset: &Dataset, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config
            .validate(dataset.num_classes())
            .map_err(AnalysisError::Config)?;

        let batches = BatchIter::new(dataset.len(), config.block_size)
            .map(|batch| analyze_batch(dataset, &config, &batch))
            .collect::<Result<Vec<_>, _>>()?;

        let analysis = Self {
            config,
            class_names: dataset.class_names().to_vec(),
            num_examples: dataset.len(),
            batches,
        };
        log::info!(
            "analysed {} batches ({} uncounted)",
            analysis.num_batches(),
            analysis.uncounted_batches()
        );
        Ok(analysis)
    }

    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    /// Batches with too few minority examples to be analysed
    #[must_use]
    pub fn uncounted_batches(&self) -> usize {
        self.batches.iter().filter(|b| !b.is_counted()).count()
    }

    /// End index of every batch
    #[must_use]
    pub fn xticks(&self) -> Vec<usize> {
        self.batches.iter().map(|b| b.end).collect()
    }

    /// Ratio of `class` in every batch
    #[must_use]
    pub fn class_ratio_series(&self, class: usize) -> Vec<f64> {
        self.batches.iter().map(|b| b.class_ratios[class]).collect()
    }

    /// Ratio of the minority class in every batch
    #[must_use]
    pub fn minority_ratio_series(&self) -> Vec<f64> {
        self.class_ratio_series(self.config.minority_index)
    }

    fn counted(&self) -> impl Iterator<Item = &MinorityProfile> {
        self.batches.iter().filter_map(|b| b.minority.as_ref())
    }

    /// Sub-cluster estimates of counted batches
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn counted_clusters(&self) -> Vec<f64> {
        self.counted().map(|m| m.clusters as f64).collect()
    }

    /// Share of minority examples of type `ty` in counted batches
    #[must_use]
    pub fn counted_type_ratios(&self, ty: MinorityType) -> Vec<f64> {
        self.counted().map(|m| m.type_ratios.get(ty)).collect()
    }

    /// Sub-cluster estimates of every batch, 0 for uncounted batches
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn cluster_series(&self) -> Vec<f64> {
        self.batches
            .iter()
            .map(|b| b.minority.as_ref().map_or(0.0, |m| m.clusters as f64))
            .collect()
    }

    /// Share of minority examples of type `ty` in every batch, 0 for
    /// uncounted batches
    #[must_use]
    pub fn type_ratio_series(&self, ty: MinorityType) -> Vec<f64> {
        self.batches
            .iter()
            .map(|b| b.minority.as_ref().map_or(0.0, |m| m.type_ratios.get(ty)))
            .collect()
    }
}

#[expect(clippy::cast_precision_loss)]
fn analyze_batch(
    dataset: &Dataset,
    config: &AnalysisConfig,
    batch: &Batch,
) -> Result<BatchRecord, AnalysisError> {
    let class_counts = dataset.class_counts(batch.range.clone());
    let class_ratios = class_counts
        .iter()
        .map(|&count| count as f64 / batch.len() as f64)
        .collect::<Vec<_>>();
    let minority_count = class_counts[config.minority_index];

    let minority = if minority_count >= config.min_minority {
        let points = dataset.rows(batch.range.clone());
        let labels = dataset.labels(batch.range.clone());

        let minority_points = points
            .iter()
            .zip(labels)
            .filter(|&(_, &label)| label == config.minority_index)
            .map(|(point, _)| point.clone())
            .collect::<Vec<_>>();
        let clusters =
            clustering::estimate_clusters(&minority_points, config.min_cluster_size, config.seed);

        let type_counts = safety::count_minority_types(
            points,
            labels,
            config.minority_index,
            config.neighbors,
            &config.thresholds,
        )
        .map_err(|source| AnalysisError::Safety {
            batch: batch.id,
            source,
        })?;

        Some(MinorityProfile {
            clusters,
            type_counts,
            type_ratios: type_counts.ratios(minority_count),
        })
    } else {
        None
    };

    match &minority {
        Some(profile) => log::debug!(
            "batch {} [{}..{}): {} minority, {} clusters, {:?}",
            batch.id,
            batch.range.start,
            batch.range.end,
            minority_count,
            profile.clusters,
            profile.type_counts
        ),
        None => log::debug!(
            "batch {} [{}..{}): {} minority, not counted",
            batch.id,
            batch.range.start,
            batch.range.end,
            minority_count
        ),
    }

    Ok(BatchRecord {
        id: batch.id,
        start: batch.range.start,
        end: batch.range.end,
        class_counts,
        class_ratios,
        minority_count,
        minority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: (f64, f64), count: u32) -> Vec<Vec<f64>> {
        (0..count)
            .map(|i| {
                let angle = f64::from(i) * 2.399;
                let radius = (f64::from(i) + 1.0).sqrt() / f64::from(count).sqrt();
                vec![
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin(),
                ]
            })
            .collect()
    }

    /// Two-class stream: batch 0 holds three compact minority groups, batch 1
    /// holds only two minority examples, batch 2 is a partial batch.
    fn sample_dataset() -> Dataset {
        let mut features = Vec::new();
        let mut labels = Vec::new();

        // batch 0: 10 majority on a line, 30 minority in three far blobs
        for i in 0..10 {
            features.push(vec![f64::from(i), 0.0]);
            labels.push(0);
        }
        for center in [(1000.0, 1000.0), (1040.0, 1000.0), (1000.0, 1040.0)] {
            for point in blob(center, 10) {
                features.push(point);
                labels.push(1);
            }
        }
        // batch 1: 38 majority, 2 minority
        for i in 0..38 {
            features.push(vec![f64::from(i), 1.0]);
            labels.push(0);
        }
        for _ in 0..2 {
            features.push(vec![10.0, 1.5]);
            labels.push(1);
        }
        // batch 2 (partial): 5 majority, 5 minority
        for i in 0..5 {
            features.push(vec![f64::from(i), 2.0]);
            labels.push(0);
            features.push(vec![f64::from(i), 2.1]);
            labels.push(1);
        }

        Dataset::new(
            vec!["x".into(), "y".into()],
            vec!["maj".into(), "min".into()],
            features,
            labels,
        )
        .unwrap()
    }

    #[test]
    fn test_counted_and_uncounted_batches() {
        let dataset = sample_dataset();
        let analysis = StreamAnalysis::run(&dataset, AnalysisConfig::new(40, 1)).unwrap();

        assert_eq!(analysis.num_examples, 90);
        assert_eq!(analysis.num_batches(), 3);
        assert_eq!(analysis.xticks(), vec![40, 80, 90]);
        assert_eq!(analysis.uncounted_batches(), 2);

        assert_eq!(analysis.minority_ratio_series(), vec![0.75, 0.05, 0.5]);
        assert_eq!(analysis.class_ratio_series(0), vec![0.25, 0.95, 0.5]);

        let first = analysis.batches[0].minority.as_ref().unwrap();
        assert_eq!(first.clusters, 3);
        assert_eq!(first.type_counts.safe, 30);
        assert_eq!(first.type_ratios.safe, 1.0);

        assert_eq!(analysis.counted_clusters(), vec![3.0]);
        assert_eq!(analysis.cluster_series(), vec![3.0, 0.0, 0.0]);
        assert_eq!(analysis.counted_type_ratios(MinorityType::Safe), vec![1.0]);
        assert_eq!(
            analysis.type_ratio_series(MinorityType::Safe),
            vec![1.0, 0.0, 0.0]
        );
        assert_eq!(
            analysis.type_ratio_series(MinorityType::Outlier),
            vec![0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_partial_batch_uses_actual_minority_count() {
        let dataset = sample_dataset();
        let mut config = AnalysisConfig::new(40, 1);
        config.min_minority = 6;
        let analysis = StreamAnalysis::run(&dataset, config).unwrap();
        // 5 minority examples in the partial batch: 0.5 * 40 would be 20
        assert!(!analysis.batches[2].is_counted());
        assert_eq!(analysis.batches[2].minority_count, 5);
    }

    #[test]
    fn test_stream_shorter_than_block() {
        let dataset = sample_dataset();
        let analysis = StreamAnalysis::run(&dataset, AnalysisConfig::new(100, 1)).unwrap();
        assert_eq!(analysis.num_batches(), 0);
        assert!(analysis.counted_clusters().is_empty());
    }

    #[test]
    fn test_config_validation() {
        let dataset = sample_dataset();

        let err = StreamAnalysis::run(&dataset, AnalysisConfig::new(0, 1)).unwrap_err();
        assert_eq!(err, AnalysisError::Config(ConfigError::ZeroBlockSize));

        let err = StreamAnalysis::run(&dataset, AnalysisConfig::new(10, 2)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::Config(ConfigError::MinorityIndex {
                index: 2,
                num_classes: 2
            })
        );

        let mut config = AnalysisConfig::new(10, 1);
        config.min_minority = 5;
        assert_eq!(
            config.validate(2),
            Err(ConfigError::MinMinorityTooSmall {
                min_minority: 5,
                neighbors: 5
            })
        );

        let mut config = AnalysisConfig::new(10, 1);
        config.thresholds.rare = 0.5;
        assert_eq!(config.validate(2), Err(ConfigError::Thresholds));
    }

    #[test]
    fn test_serializes_records() {
        let dataset = sample_dataset();
        let analysis = StreamAnalysis::run(&dataset, AnalysisConfig::new(40, 1)).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["batches"][0]["minority"]["clusters"], 3);
        assert!(json["batches"][1]["minority"].is_null());
        assert_eq!(json["config"]["block_size"], 40);
    }
}
