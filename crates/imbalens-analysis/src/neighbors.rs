//! Exact k-nearest-neighbour search with a k-d tree
//!
//! The tree does not own its points: it borrows the batch's feature rows and
//! stores only indices into them, so it is built once per batch and queried
//! for every member of that batch.
//!
//! Distances are Euclidean. Results are ordered by distance with ties broken
//! by the smaller point index, which makes neighbourhoods reproducible even
//! when a batch contains duplicate examples.

use std::{cmp::Ordering, collections::BinaryHeap};

/// An immutable k-d tree over a set of n-dimensional points.
#[derive(Debug, Clone)]
pub struct KdTree<'a> {
    points: &'a [Vec<f64>],
    nodes: Vec<Node>,
    root: Option<usize>,
}

/// A tree node; `left`/`right` index into the node vector and `point_index`
/// into the point slice.
#[derive(Debug, Clone)]
struct Node {
    split_axis: usize,
    point_index: usize,
    left: Option<usize>,
    right: Option<usize>,
}

impl<'a> KdTree<'a> {
    /// Build a tree over `points`, splitting on axes in round-robin order.
    ///
    /// # Examples
    ///
    /// ```
    /// use imbalens_analysis::neighbors::KdTree;
    ///
    /// let points = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0], vec![0.0, 1.5]];
    /// let tree = KdTree::build(&points);
    /// assert_eq!(tree.nearest(0, 2), vec![1, 3]);
    /// ```
    #[must_use]
    pub fn build(points: &'a [Vec<f64>]) -> Self {
        let mut tree = Self {
            points,
            nodes: Vec::with_capacity(points.len()),
            root: None,
        };
        let mut indices = (0..points.len()).collect::<Vec<_>>();
        tree.root = tree.build_recursive(&mut indices, 0);
        tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn dims(&self) -> usize {
        self.points.first().map_or(0, Vec::len)
    }

    fn build_recursive(&mut self, indices: &mut [usize], depth: usize) -> Option<usize> {
        if indices.is_empty() {
            return None;
        }
        let split_axis = depth % self.dims().max(1);
        let points = self.points;
        indices.sort_by(|&a, &b| {
            coord(&points[a], split_axis)
                .total_cmp(&coord(&points[b], split_axis))
                .then(a.cmp(&b))
        });

        let median = indices.len() / 2;
        let point_index = indices[median];
        let (lower, rest) = indices.split_at_mut(median);
        let upper = &mut rest[1..];

        let left = self.build_recursive(lower, depth + 1);
        let right = self.build_recursive(upper, depth + 1);
        self.nodes.push(Node {
            split_axis,
            point_index,
            left,
            right,
        });
        Some(self.nodes.len() - 1)
    }

    /// Indices of the `k` points nearest to point `index`, nearest first.
    ///
    /// The point itself is never part of its own neighbourhood, even when
    /// other points share its exact coordinates. Fewer than `k` indices are
    /// returned only when the tree holds `k` or fewer points.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[must_use]
    pub fn nearest(&self, index: usize, k: usize) -> Vec<usize> {
        let query = &self.points[index];
        let mut heap = BinaryHeap::with_capacity(k + 1);
        if k > 0 {
            self.search(self.root, query, index, k, &mut heap);
        }
        heap.into_sorted_vec()
            .into_iter()
            .map(|candidate| candidate.index)
            .collect()
    }

    fn search(
        &self,
        node: Option<usize>,
        query: &[f64],
        exclude: usize,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let Some(node) = node else {
            return;
        };
        let node = &self.nodes[node];
        let point = &self.points[node.point_index];

        if node.point_index != exclude {
            let candidate = Candidate {
                dist_sq: squared_distance(query, point),
                index: node.point_index,
            };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        let diff = coord(query, node.split_axis) - coord(point, node.split_axis);
        let (near, far) = if diff <= 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        self.search(near, query, exclude, k, heap);
        let must_visit_far =
            heap.len() < k || heap.peek().is_some_and(|worst| diff * diff <= worst.dist_sq);
        if must_visit_far {
            self.search(far, query, exclude, k, heap);
        }
    }
}

/// Squared Euclidean distance between two rows of equal width
#[must_use]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn coord(point: &[f64], axis: usize) -> f64 {
    point.get(axis).copied().unwrap_or(0.0)
}

/// Heap entry ordered by distance, then index
#[derive(Debug, Clone, Copy)]
struct Candidate {
    dist_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist_sq
            .total_cmp(&other.dist_sq)
            .then(self.index.cmp(&other.index))
    }
}
