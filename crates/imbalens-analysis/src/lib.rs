//! Batch-wise class imbalance analysis of labeled data streams
//!
//! This crate treats a labeled dataset as a stream, cuts it into fixed-size
//! batches and characterises the minority class inside every batch.
//!
//! # Overview
//!
//! 1. **Load Data** ([`arff::parse`]): Read an ARFF file into a [`dataset::Dataset`],
//!    one-hot encoding nominal features
//! 2. **Batch** ([`batch::BatchIter`]): Walk the stream in consecutive blocks
//! 3. **Analyse Batches** ([`stream::StreamAnalysis`]): For every batch compute
//!    - class ratios
//!    - minority sub-clusters via affinity propagation ([`clustering`])
//!    - safe, borderline, rare and outlier minority shares via k nearest
//!      neighbours ([`safety`], [`neighbors`])
//!
//! # Example
//!
//! ```
//! use imbalens_analysis::{arff, stream::{AnalysisConfig, StreamAnalysis}};
//!
//! let text = "\
//! @relation toy
//! @attribute x numeric
//! @attribute class {neg,pos}
//! @data
//! 0,neg
//! 1,neg
//! 2,pos
//! 3,neg
//! ";
//! let dataset = arff::parse(text, None).unwrap();
//! let analysis = StreamAnalysis::run(&dataset, AnalysisConfig::new(2, 1)).unwrap();
//! assert_eq!(analysis.minority_ratio_series(), vec![0.0, 0.5]);
//! assert_eq!(analysis.uncounted_batches(), 2);
//! ```

pub mod arff;
pub mod batch;
pub mod clustering;
pub mod dataset;
pub mod neighbors;
pub mod safety;
pub mod stream;
