// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::SummaryTree;
use crate::{bound::Interval, dataset::ContinuousView};

/// Parameters of one KD-tree construction.
pub struct BuildParams<'a> {
    /// Continuous dimensions to split on, cycled by depth
    pub split_dims: &'a [usize],

    /// Maximum tree depth; deeper levels collapse into leaves
    pub max_depth: u32,

    /// Split-position blend in `[0, 1]`: 1 picks the positional median
    /// (balanced, fast trees), 0 picks the position that bisects the axis
    /// range (accurate trees)
    pub blend: f32,
}

/// Returns the depth cap for a partition of `rows` rows,
/// `max(1, ⌊log2(rows) + adjustment⌋)`.
///
/// Negative adjustments truncate the tree, trading error for memory.
#[must_use]
pub fn depth_cap(rows: usize, adjustment: i32) -> u32 {
    // NOTE: Truncation is the point, the cap is a whole number of levels
    #[allow(clippy::cast_possible_truncation)]
    let cap = ((rows as f64).log2() + f64::from(adjustment)) as i32;

    cap.max(1).unsigned_abs()
}

/// Builds a summary KD-tree over the rows listed in `ids`.
///
/// `ids` is reordered in place; the absolute order within each final leaf
/// is irrelevant, only the quickselect partitioning matters. An empty `ids`
/// yields an empty tree.
#[must_use]
pub fn build_tree(view: &ContinuousView<'_>, ids: &mut [u32], params: &BuildParams<'_>) -> SummaryTree {
    let mut tree = SummaryTree::new(view.dims());

    if !ids.is_empty() {
        build_node(&mut tree, view, ids, 0, params);
    }

    tree
}

fn build_node(
    tree: &mut SummaryTree,
    view: &ContinuousView<'_>,
    ids: &mut [u32],
    depth: u32,
    params: &BuildParams<'_>,
) -> u32 {
    let n = ids.len();
    let k = params.split_dims.len();

    if n == 1 || depth >= params.max_depth || k == 0 {
        return push_leaf(tree, view, ids);
    }

    let axis = params.split_dims[depth as usize % k];
    let median = split_position(view, ids, axis, params.blend);

    // No forward progress, the right half would be empty
    if median == n - 1 {
        return push_leaf(tree, view, ids);
    }

    ids.select_nth_unstable_by(median, |a, b| {
        view.value(*a, axis).total_cmp(&view.value(*b, axis))
    });

    let idx = tree.push_empty();

    let (lower, upper) = ids.split_at_mut(median + 1);
    let left = build_node(tree, view, lower, depth + 1, params);
    let right = build_node(tree, view, upper, depth + 1, params);

    tree.absorb(idx, left);
    tree.absorb(idx, right);
    tree.set_children(idx, left, right);

    idx
}

/// Picks the split position within `ids` on `axis`.
///
/// The positional median is blended with the position that bisects the
/// axis range; the range scan is skipped when the blend makes its weight
/// zero.
fn split_position(view: &ContinuousView<'_>, ids: &[u32], axis: usize, blend: f32) -> usize {
    let performance = (ids.len() - 1) / 2;

    // NOTE: Exact comparison mirrors the parameter's contract, 1.0 means
    // "positional median only"
    #[allow(clippy::float_cmp)]
    let accuracy = if blend == 1.0 {
        0
    } else {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;

        for &row in ids {
            let value = view.value(row, axis);
            min = min.min(value);
            max = max.max(value);
        }

        let mid = (min + max) / 2.0;

        ids.iter().filter(|&&row| view.value(row, axis) < mid).count()
    };

    let blend = f64::from(blend);
    let blended = (performance as f64) * blend + (accuracy as f64) * (1.0 - blend);

    // NOTE: Both medians lie in [0, n), so does their blend
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let position = blended.round() as usize;

    position
}

fn push_leaf(tree: &mut SummaryTree, view: &ContinuousView<'_>, ids: &[u32]) -> u32 {
    let dims = view.dims();

    let mut sums = vec![0.0f64; dims];
    let mut bounds = vec![Interval::EMPTY; dims];

    for &row in ids {
        for (dim, (sum, bound)) in sums.iter_mut().zip(&mut bounds).enumerate() {
            let value = view.value(row, dim);
            *sum += f64::from(value);
            bound.extend(value);
        }
    }

    let idx = tree.push_empty();

    // NOTE: A partition's row count fits u32, the dataset loader checks
    #[allow(clippy::cast_possible_truncation)]
    tree.set_summary(idx, ids.len() as u32, &sums, &bounds);

    idx
}
