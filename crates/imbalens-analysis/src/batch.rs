//! Sequential fixed-size batching of a stream
//!
//! A stream of `len` examples is cut into consecutive blocks of `block_size`
//! examples. The last block holds the remainder when `len` is not a multiple of
//! `block_size`; a stream shorter than one block yields no batches at all.
//!
//! ```
//! use imbalens_analysis::batch::BatchIter;
//!
//! let ends: Vec<_> = BatchIter::new(25, 10).map(|b| b.end()).collect();
//! assert_eq!(ends, vec![10, 20, 25]);
//! ```

use std::ops::Range;

use serde::Serialize;

/// A contiguous slice of the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    /// Zero-based position of the batch in the stream
    pub id: usize,
    /// Example indices covered by the batch
    pub range: Range<usize>,
}

impl Batch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.range.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Exclusive end index, used as the time step of the batch
    #[must_use]
    pub fn end(&self) -> usize {
        self.range.end
    }
}

/// Iterator over the batches of a stream
#[derive(Debug, Clone)]
pub struct BatchIter {
    len: usize,
    block_size: usize,
    next_id: usize,
    start: usize,
}

impl BatchIter {
    /// # Panics
    ///
    /// Panics if `block_size` is zero.
    #[must_use]
    pub fn new(len: usize, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be positive");
        Self {
            len,
            block_size,
            next_id: 0,
            start: 0,
        }
    }
}

impl Iterator for BatchIter {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        // the first block must be complete; later ones may be partial
        let end = if self.next_id == 0 {
            if self.block_size > self.len {
                return None;
            }
            self.block_size
        } else {
            if self.start >= self.len {
                return None;
            }
            (self.start + self.block_size).min(self.len)
        };

        let batch = Batch {
            id: self.next_id,
            range: self.start..end,
        };
        self.next_id += 1;
        self.start = end;
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple() {
        let batches = BatchIter::new(30, 10).collect::<Vec<_>>();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], Batch { id: 2, range: 20..30 });
    }

    #[test]
    fn test_partial_last_batch() {
        let batches = BatchIter::new(23, 10).collect::<Vec<_>>();
        let ranges = batches.iter().map(|b| b.range.clone()).collect::<Vec<_>>();
        assert_eq!(ranges, vec![0..10, 10..20, 20..23]);
        assert_eq!(batches[2].len(), 3);
    }

    #[test]
    fn test_stream_shorter_than_block() {
        assert_eq!(BatchIter::new(9, 10).count(), 0);
        assert_eq!(BatchIter::new(0, 10).count(), 0);
    }

    #[test]
    fn test_stream_equal_to_block() {
        let batches = BatchIter::new(10, 10).collect::<Vec<_>>();
        assert_eq!(batches, vec![Batch { id: 0, range: 0..10 }]);
    }

    #[test]
    #[should_panic(expected = "block size must be positive")]
    fn test_zero_block_size() {
        let _ = BatchIter::new(10, 0);
    }
}
