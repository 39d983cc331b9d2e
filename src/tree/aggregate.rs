// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{SummaryTree, NIL};
use crate::bound::Bounds;

/// Accumulated approximate aggregates of one range query.
#[derive(Clone, Debug)]
pub struct RangeAggregate {
    /// Approximate number of rows inside the query box
    pub count: f64,

    /// Approximate per-dimension sums of the rows inside the query box
    pub sums: Vec<f64>,
}

impl RangeAggregate {
    /// Creates a zeroed accumulator over `dims` dimensions.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            count: 0.0,
            sums: vec![0.0; dims],
        }
    }

    /// Zeroes the accumulator for reuse.
    pub fn reset(&mut self) {
        self.count = 0.0;
        self.sums.fill(0.0);
    }
}

impl SummaryTree {
    /// Accumulates the approximate count and per-dimension sums of the rows
    /// inside `query`.
    ///
    /// `split_dims` are the model's split axes: containment and intersection
    /// tests consult only those (fast pruning), while the overlap ratio uses
    /// every dimension (better accuracy on non-split dimensions).
    pub fn aggregate_range(&self, query: &Bounds, split_dims: &[usize], acc: &mut RangeAggregate) {
        if let Some(root) = self.root() {
            self.descend(root, query, split_dims, acc);
        }
    }

    fn descend(&self, idx: u32, query: &Bounds, split_dims: &[usize], acc: &mut RangeAggregate) {
        let node = self.node(idx);
        let bounds = self.bounds_of(idx);

        if node.is_leaf() || query.encloses(bounds, split_dims) {
            let ratio = query.overlap_ratio(bounds);

            if ratio > 0.0 {
                acc.count += f64::from(node.count()) * ratio;

                for (acc_sum, sum) in acc.sums.iter_mut().zip(self.sums_of(idx)) {
                    *acc_sum += sum * ratio;
                }
            }

            return;
        }

        for child in [node.left, node.right] {
            if child != NIL && query.intersects(self.bounds_of(child), split_dims) {
                self.descend(child, query, split_dims, acc);
            }
        }
    }
}
