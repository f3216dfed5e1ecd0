//! In-memory labeled dataset
//!
//! A [`Dataset`] is the data table the analysis consumes: a row-major numeric
//! feature matrix in stream order, one class index per row, and the declared
//! class names.
//!
//! # Data Structure
//!
//! ```text
//! Dataset
//! ├─ feature_names: Vec<String>      (numeric + one-hot encoded columns)
//! ├─ class_names: Vec<String>        (declared order defines class indices)
//! ├─ features: Vec<Vec<f64>>         (one row per example, stream order)
//! └─ labels: Vec<usize>              (class index per row)
//! ```
//!
//! Datasets are usually produced by [`arff::parse`](crate::arff::parse), but can
//! be built directly for tests or other loaders:
//!
//! ```
//! use imbalens_analysis::dataset::Dataset;
//!
//! let dataset = Dataset::new(
//!     vec!["x".into()],
//!     vec!["neg".into(), "pos".into()],
//!     vec![vec![0.0], vec![1.0], vec![2.0]],
//!     vec![0, 0, 1],
//! )
//! .unwrap();
//! assert_eq!(dataset.class_counts(0..3), vec![2, 1]);
//! ```

use std::ops::Range;

/// Errors raised when assembling a dataset from inconsistent parts
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum DatasetError {
    #[display("dataset declares no class values")]
    NoClasses,
    #[display("row {row} has {actual} features, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[display("row {row} has class index {index}, but only {num_classes} classes are declared")]
    ClassIndex {
        row: usize,
        index: usize,
        num_classes: usize,
    },
    #[display("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
}

/// Labeled examples in stream order
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    class_names: Vec<String>,
    features: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl Dataset {
    /// Assemble a dataset, checking that every row has the declared width and
    /// every label refers to a declared class.
    pub fn new(
        feature_names: Vec<String>,
        class_names: Vec<String>,
        features: Vec<Vec<f64>>,
        labels: Vec<usize>,
    ) -> Result<Self, DatasetError> {
        if class_names.is_empty() {
            return Err(DatasetError::NoClasses);
        }
        if features.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        let width = feature_names.len();
        for (row, values) in features.iter().enumerate() {
            if values.len() != width {
                return Err(DatasetError::RowWidth {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
        }
        for (row, &index) in labels.iter().enumerate() {
            if index >= class_names.len() {
                return Err(DatasetError::ClassIndex {
                    row,
                    index,
                    num_classes: class_names.len(),
                });
            }
        }
        Ok(Self {
            feature_names,
            class_names,
            features,
            labels,
        })
    }

    /// Number of examples
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Index of a class label in declaration order
    #[must_use]
    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.class_names.iter().position(|name| name == label)
    }

    /// Feature rows in `range`
    #[must_use]
    pub fn rows(&self, range: Range<usize>) -> &[Vec<f64>] {
        &self.features[range]
    }

    /// Class indices in `range`
    #[must_use]
    pub fn labels(&self, range: Range<usize>) -> &[usize] {
        &self.labels[range]
    }

    /// Number of examples of each class in `range`, indexed by class
    #[must_use]
    pub fn class_counts(&self, range: Range<usize>) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes()];
        for &label in &self.labels[range] {
            counts[label] += 1;
        }
        counts
    }
}
