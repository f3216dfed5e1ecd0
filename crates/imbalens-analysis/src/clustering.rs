//! Affinity propagation clustering of minority examples
//!
//! Affinity propagation exchanges "responsibility" and "availability" messages
//! between all pairs of points until a stable set of exemplars emerges. The
//! number of clusters is an output, not a parameter.
//!
//! # Parameters
//!
//! - Similarity: negative squared Euclidean distance
//! - Preference: median of the similarity matrix (diagonal included) unless set
//! - Damping `0.5`, at most `200` iterations, converged once the exemplar set
//!   has been unchanged for `15` iterations
//! - A tiny seeded Gaussian perturbation of the similarities breaks ties, so
//!   results are deterministic for a given seed
//!
//! # Examples
//!
//! ```
//! use imbalens_analysis::clustering::{AffinityPropagation, estimate_clusters};
//!
//! let mut points = Vec::new();
//! for i in 0..8 {
//!     let jitter = f64::from(i) * 0.01;
//!     points.push(vec![jitter, 0.0]);
//!     points.push(vec![50.0 + jitter, 50.0]);
//! }
//! let labels = AffinityPropagation::default().fit(&points);
//! assert_eq!(labels.cluster_sizes().len(), 2);
//! assert_eq!(estimate_clusters(&points, 6, 1), 2);
//! ```

use imbalens_stats::quartiles;
use rand::{Rng as _, SeedableRng as _};
use rand_distr::StandardNormal;
use rand_pcg::Pcg32;

use crate::neighbors::squared_distance;

/// Seed used for the tie-breaking noise unless configured otherwise
pub const DEFAULT_SEED: u64 = 1;

/// Outcome of an affinity propagation run
#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum ClusterLabels {
    /// Cluster label of every point (`0..exemplars.len()`) and the point index
    /// of each cluster's exemplar.
    Converged {
        labels: Vec<usize>,
        exemplars: Vec<usize>,
    },
    /// The messages never settled within the iteration limit.
    NotConverged { points: usize },
}

impl ClusterLabels {
    /// Number of members of each cluster.
    ///
    /// A run that did not converge is one group holding every point.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        match self {
            Self::Converged { labels, exemplars } => {
                let mut sizes = vec![0; exemplars.len()];
                for &label in labels {
                    sizes[label] += 1;
                }
                sizes
            }
            Self::NotConverged { points: 0 } => vec![],
            Self::NotConverged { points } => vec![*points],
        }
    }
}

/// Affinity propagation configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffinityPropagation {
    pub damping: f64,
    pub max_iter: usize,
    pub convergence_iter: usize,
    /// Self-similarity of every point; median similarity when `None`
    pub preference: Option<f64>,
    pub seed: u64,
}

impl Default for AffinityPropagation {
    fn default() -> Self {
        Self {
            damping: 0.5,
            max_iter: 200,
            convergence_iter: 15,
            preference: None,
            seed: DEFAULT_SEED,
        }
    }
}

/// Dense row-major `n x n` matrix
#[derive(Debug, Clone)]
struct Matrix {
    n: usize,
    data: Vec<f64>,
}

impl Matrix {
    fn zeros(n: usize) -> Self {
        Self {
            n,
            data: vec![0.0; n * n],
        }
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.n + j] = value;
    }
}

impl AffinityPropagation {
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Cluster `points`.
    #[must_use]
    pub fn fit(&self, points: &[Vec<f64>]) -> ClusterLabels {
        let n = points.len();
        if n == 0 {
            return ClusterLabels::Converged {
                labels: vec![],
                exemplars: vec![],
            };
        }

        let mut s = Matrix::zeros(n);
        for i in 0..n {
            for j in 0..n {
                s.set(i, j, -squared_distance(&points[i], &points[j]));
            }
        }
        let preference = self.preference.unwrap_or_else(|| {
            let mut sorted = s.data.clone();
            sorted.sort_by(f64::total_cmp);
            quartiles::median(&sorted).unwrap_or(0.0)
        });

        if n == 1 || off_diagonal_all_equal(&s) {
            // messages carry no information; the preference alone decides
            log::debug!("affinity propagation on {n} indistinguishable points");
            return if preference >= s.get(0, n - 1) {
                ClusterLabels::Converged {
                    labels: (0..n).collect(),
                    exemplars: (0..n).collect(),
                }
            } else {
                ClusterLabels::Converged {
                    labels: vec![0; n],
                    exemplars: vec![0],
                }
            };
        }

        for i in 0..n {
            s.set(i, i, preference);
        }
        let mut rng = Pcg32::seed_from_u64(self.seed);
        for value in &mut s.data {
            let noise: f64 = rng.sample(StandardNormal);
            *value += (f64::EPSILON * *value + f64::MIN_POSITIVE * 100.0) * noise;
        }

        match self.exemplar_flags(&s) {
            Some(flags) => assign_clusters(&s, &flags),
            None => {
                log::warn!(
                    "affinity propagation did not converge within {} iterations",
                    self.max_iter
                );
                ClusterLabels::NotConverged { points: n }
            }
        }
    }

    /// Run the message passing loop; `Some(flags)` marks the exemplars once
    /// the exemplar set is stable.
    fn exemplar_flags(&self, s: &Matrix) -> Option<Vec<bool>> {
        let n = s.n;
        let conv = self.convergence_iter.max(1);
        let damping = self.damping;
        let mut r = Matrix::zeros(n);
        let mut a = Matrix::zeros(n);
        let mut history = vec![false; n * conv];
        let mut flags = vec![false; n];
        let mut col_sums = vec![0.0; n];

        for it in 0..self.max_iter {
            // responsibilities
            for i in 0..n {
                let (mut best_k, mut best, mut second) = (0, f64::NEG_INFINITY, f64::NEG_INFINITY);
                for k in 0..n {
                    let v = a.get(i, k) + s.get(i, k);
                    if v > best {
                        second = best;
                        best = v;
                        best_k = k;
                    } else if v > second {
                        second = v;
                    }
                }
                for k in 0..n {
                    let target = if k == best_k {
                        s.get(i, k) - second
                    } else {
                        s.get(i, k) - best
                    };
                    r.set(i, k, damping * r.get(i, k) + (1.0 - damping) * target);
                }
            }

            // availabilities
            col_sums.fill(0.0);
            for i in 0..n {
                for (k, sum) in col_sums.iter_mut().enumerate() {
                    let v = r.get(i, k);
                    *sum += if i == k { v } else { v.max(0.0) };
                }
            }
            for i in 0..n {
                for k in 0..n {
                    let v = r.get(i, k);
                    let target = if i == k {
                        col_sums[k] - v
                    } else {
                        (col_sums[k] - v.max(0.0)).min(0.0)
                    };
                    a.set(i, k, damping * a.get(i, k) + (1.0 - damping) * target);
                }
            }

            // convergence check
            let slot = it % conv;
            for (i, flag) in flags.iter_mut().enumerate() {
                *flag = a.get(i, i) + r.get(i, i) > 0.0;
                history[i * conv + slot] = *flag;
            }
            if it >= conv {
                let stable = history.chunks(conv).all(|h| {
                    let count = h.iter().filter(|&&f| f).count();
                    count == 0 || count == conv
                });
                if stable && flags.iter().any(|&f| f) {
                    log::trace!("affinity propagation converged after {} iterations", it + 1);
                    return Some(flags);
                }
            }
        }
        None
    }
}

fn off_diagonal_all_equal(s: &Matrix) -> bool {
    let first = s.get(0, 1);
    (0..s.n).all(|i| (0..s.n).all(|j| i == j || s.get(i, j) == first))
}

/// Index of the first maximum of `f` over `candidates`
fn argmax<F>(candidates: &[usize], mut f: F) -> usize
where
    F: FnMut(usize) -> f64,
{
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (pos, &c) in candidates.iter().enumerate() {
        let v = f(c);
        if v > best_value {
            best = pos;
            best_value = v;
        }
    }
    best
}

/// Attach every point to its most similar exemplar, refine each exemplar to
/// the member with the highest total similarity to its cluster, and relabel
/// clusters in exemplar index order.
fn assign_clusters(s: &Matrix, flags: &[bool]) -> ClusterLabels {
    let n = s.n;
    let mut exemplars = (0..n).filter(|&i| flags[i]).collect::<Vec<_>>();
    let nearest_exemplar = |exemplars: &[usize]| {
        let mut c = (0..n)
            .map(|i| argmax(exemplars, |e| s.get(i, e)))
            .collect::<Vec<_>>();
        for (k, &e) in exemplars.iter().enumerate() {
            c[e] = k;
        }
        c
    };

    let c = nearest_exemplar(&exemplars);
    for (k, exemplar) in exemplars.iter_mut().enumerate() {
        let members = (0..n).filter(|&i| c[i] == k).collect::<Vec<_>>();
        let best = argmax(&members, |j| members.iter().map(|&i| s.get(i, j)).sum());
        *exemplar = members[best];
    }

    let c = nearest_exemplar(&exemplars);
    let point_exemplars = c.iter().map(|&k| exemplars[k]).collect::<Vec<_>>();
    let mut centers = point_exemplars.clone();
    centers.sort_unstable();
    centers.dedup();
    let labels = point_exemplars
        .iter()
        .map(|e| centers.binary_search(e).unwrap_or_default())
        .collect();

    ClusterLabels::Converged {
        labels,
        exemplars: centers,
    }
}

/// Number of minority sub-clusters with at least `min_cluster_size` members.
///
/// Returns 0 when there are fewer than `min_cluster_size` points to cluster.
#[must_use]
pub fn estimate_clusters(points: &[Vec<f64>], min_cluster_size: usize, seed: u64) -> usize {
    if points.len() < min_cluster_size {
        return 0;
    }
    let labels = AffinityPropagation::with_seed(seed).fit(points);
    labels
        .cluster_sizes()
        .into_iter()
        .filter(|&size| size >= min_cluster_size)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(center: (f64, f64), count: u32, spread: f64) -> Vec<Vec<f64>> {
        (0..count)
            .map(|i| {
                let angle = f64::from(i) * 2.399;
                let radius = spread * (f64::from(i) + 1.0).sqrt() / f64::from(count).sqrt();
                vec![
                    center.0 + radius * angle.cos(),
                    center.1 + radius * angle.sin(),
                ]
            })
            .collect()
    }

    #[test]
    fn test_three_separated_blobs() {
        let mut points = blob((0.0, 0.0), 10, 1.0);
        points.extend(blob((40.0, 0.0), 10, 1.0));
        points.extend(blob((0.0, 40.0), 10, 1.0));

        let labels = AffinityPropagation::default().fit(&points);
        let ClusterLabels::Converged { labels, exemplars } = labels else {
            panic!("expected convergence");
        };
        assert_eq!(exemplars.len(), 3);
        // members of one blob share a label, blobs differ
        for chunk in labels.chunks(10) {
            assert!(chunk.iter().all(|&l| l == chunk[0]));
        }
        assert_ne!(labels[0], labels[10]);
        assert_ne!(labels[10], labels[20]);
        assert_ne!(labels[0], labels[20]);
    }

    #[test]
    fn test_estimate_ignores_small_clusters() {
        let mut points = blob((0.0, 0.0), 12, 1.0);
        points.extend(blob((50.0, 0.0), 12, 1.0));
        points.extend(blob((0.0, 50.0), 3, 0.5));
        assert_eq!(estimate_clusters(&points, 6, DEFAULT_SEED), 2);
    }

    #[test]
    fn test_estimate_needs_min_points() {
        let points = blob((0.0, 0.0), 5, 1.0);
        assert_eq!(estimate_clusters(&points, 6, DEFAULT_SEED), 0);
    }

    #[test]
    fn test_identical_points_are_singletons() {
        let points = vec![vec![3.0, 3.0]; 7];
        let labels = AffinityPropagation::default().fit(&points);
        assert_eq!(labels.cluster_sizes(), vec![1; 7]);
        assert_eq!(estimate_clusters(&points, 6, DEFAULT_SEED), 0);
    }

    #[test]
    fn test_low_preference_on_equal_similarities_gives_one_cluster() {
        let points = vec![vec![0.0], vec![1.0]];
        let ap = AffinityPropagation {
            preference: Some(-10.0),
            ..AffinityPropagation::default()
        };
        assert_eq!(
            ap.fit(&points),
            ClusterLabels::Converged {
                labels: vec![0, 0],
                exemplars: vec![0],
            }
        );
    }

    #[test]
    fn test_single_point() {
        let labels = AffinityPropagation::default().fit(&[vec![1.0]]);
        assert_eq!(labels.cluster_sizes(), vec![1]);
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let mut points = blob((0.0, 0.0), 15, 4.0);
        points.extend(blob((6.0, 0.0), 15, 4.0));
        let first = AffinityPropagation::with_seed(9).fit(&points);
        let second = AffinityPropagation::with_seed(9).fit(&points);
        assert_eq!(first, second);
    }

    #[test]
    fn test_not_converged_is_one_group() {
        let labels = ClusterLabels::NotConverged { points: 9 };
        assert_eq!(labels.cluster_sizes(), vec![9]);
        assert!(labels.is_not_converged());
    }

    #[test]
    fn test_iteration_limit_before_stability_window_does_not_converge() {
        let mut points = blob((0.0, 0.0), 10, 1.0);
        points.extend(blob((40.0, 0.0), 10, 1.0));
        let ap = AffinityPropagation {
            max_iter: 10,
            ..AffinityPropagation::default()
        };
        let labels = ap.fit(&points);
        assert_eq!(labels, ClusterLabels::NotConverged { points: 20 });
        assert_eq!(labels.cluster_sizes(), vec![20]);
    }
}
