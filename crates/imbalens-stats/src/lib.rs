//! Statistical utilities for the imbalens project.
//!
//! This crate provides the summary statistics reported for per-batch series:
//!
//! - **Descriptive statistics**: minimum, maximum, mean, median, sample standard deviation
//! - **Quartiles**: median-of-halves quartiles and interquartile range
//! - **Series summary**: descriptive statistics and quartiles combined
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`quartiles`]: Quartile and median computation
//! - [`summary`]: Combined summary used by reports
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use imbalens_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert!((stats.std_dev.unwrap() - 2.5_f64.sqrt()).abs() < 1e-12);
//! ```
//!
//! ## Computing quartiles
//!
//! ```
//! use imbalens_stats::quartiles::Quartiles;
//!
//! let quartiles = Quartiles::new(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(quartiles.q1, 1.5);
//! assert_eq!(quartiles.q3, 4.5);
//! ```

pub mod descriptive;
pub mod quartiles;
pub mod summary;
