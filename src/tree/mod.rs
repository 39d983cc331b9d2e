// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Fractional-overlap range aggregation
pub mod aggregate;

/// Blended-median KD-tree construction
pub mod builder;

use crate::{
    bound::Interval,
    coding::{Decode, DecodeError, Encode, EncodeError},
};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Sentinel child index for "no child"
pub(crate) const NIL: u32 = u32::MAX;

const FLAG_LEFT: u8 = 0b01;
const FLAG_RIGHT: u8 = 0b10;

/// Child links and row count of one summary node.
///
/// The per-dimension sums and bounds live in the tree's flat side arrays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Node {
    pub(crate) left: u32,
    pub(crate) right: u32,
    pub(crate) count: u32,
}

impl Node {
    /// Returns `true` if the node has no children.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.left == NIL && self.right == NIL
    }

    /// Returns the number of rows in the node's subtree.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}

/// A summary KD-tree over the continuous dimensions of one dataset
/// partition.
///
/// Nodes live in a flat arena in pre-order (the root, if any, is index 0)
/// and reference their children by `u32` index, with `u32::MAX` marking an
/// absent child. Each node carries the row count of its subtree; the
/// per-dimension sums and tight bounding boxes are kept in parallel arrays
/// with `dims` entries per node, so serializing the tree is a single linear
/// pass over the arena.
#[derive(Debug, PartialEq)]
pub struct SummaryTree {
    dims: usize,
    nodes: Vec<Node>,
    sums: Vec<f64>,
    bounds: Vec<Interval>,
}

impl SummaryTree {
    /// Creates an empty tree over `dims` continuous dimensions.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            nodes: Vec::new(),
            sums: Vec::new(),
            bounds: Vec::new(),
        }
    }

    /// Returns the number of continuous dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the root index, or `None` for an empty tree.
    #[must_use]
    pub fn root(&self) -> Option<u32> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    /// Returns one node by index.
    #[must_use]
    pub fn node(&self, idx: u32) -> Node {
        self.nodes[idx as usize]
    }

    /// Returns the per-dimension sums of one node.
    #[must_use]
    pub fn sums_of(&self, idx: u32) -> &[f64] {
        let start = idx as usize * self.dims;
        &self.sums[start..start + self.dims]
    }

    /// Returns the bounding box of one node.
    #[must_use]
    pub fn bounds_of(&self, idx: u32) -> &[Interval] {
        let start = idx as usize * self.dims;
        &self.bounds[start..start + self.dims]
    }

    /// Returns the approximate heap footprint of one node, in bytes.
    #[must_use]
    pub fn node_footprint(dims: usize) -> usize {
        std::mem::size_of::<Node>()
            + dims * (std::mem::size_of::<f64>() + std::mem::size_of::<Interval>())
    }

    /// Returns the approximate heap footprint of the tree, in bytes.
    #[must_use]
    pub fn approximate_size(&self) -> u64 {
        (self.nodes.len() * Self::node_footprint(self.dims)) as u64
    }

    /// Appends a zeroed node and returns its index.
    pub(crate) fn push_empty(&mut self) -> u32 {
        // NOTE: Arena indices are u32 by design (halves the node size);
        // a single partition never holds 4 billion nodes
        #[allow(clippy::cast_possible_truncation)]
        let idx = self.nodes.len() as u32;

        self.nodes.push(Node {
            left: NIL,
            right: NIL,
            count: 0,
        });
        self.sums.resize(self.sums.len() + self.dims, 0.0);
        self.bounds
            .resize(self.bounds.len() + self.dims, Interval::EMPTY);

        idx
    }

    /// Fills in a node's summary.
    pub(crate) fn set_summary(&mut self, idx: u32, count: u32, sums: &[f64], bounds: &[Interval]) {
        let start = idx as usize * self.dims;
        self.nodes[idx as usize].count = count;
        self.sums[start..start + self.dims].copy_from_slice(sums);
        self.bounds[start..start + self.dims].copy_from_slice(bounds);
    }

    /// Links a node to its children.
    pub(crate) fn set_children(&mut self, idx: u32, left: u32, right: u32) {
        let node = &mut self.nodes[idx as usize];
        node.left = left;
        node.right = right;
    }

    /// Folds a child's count, sums and bounds into a parent.
    ///
    /// The parent precedes the child in the arena (pre-order).
    pub(crate) fn absorb(&mut self, parent: u32, child: u32) {
        let parent = parent as usize;
        let child = child as usize;
        debug_assert!(parent < child);

        self.nodes[parent].count += self.nodes[child].count;

        let p = parent * self.dims;
        let c = child * self.dims;

        let (front, back) = self.sums.split_at_mut(c);
        for (sum, child_sum) in front[p..p + self.dims].iter_mut().zip(&back[..self.dims]) {
            *sum += child_sum;
        }

        let (front, back) = self.bounds.split_at_mut(c);
        for (bound, child_bound) in front[p..p + self.dims].iter_mut().zip(&back[..self.dims]) {
            bound.merge(child_bound);
        }
    }

    fn decode_node<R: Read>(&mut self, reader: &mut R) -> crate::Result<u32> {
        let flags = reader.read_u8()?;

        if flags & !(FLAG_LEFT | FLAG_RIGHT) != 0 {
            return Err(DecodeError::InvalidTag(("NodeFlags", flags)).into());
        }

        let count = reader.read_u32::<LittleEndian>()?;

        let idx = self.push_empty();
        self.nodes[idx as usize].count = count;

        let start = idx as usize * self.dims;

        for dim in 0..self.dims {
            self.sums[start + dim] = reader.read_f64::<LittleEndian>()?;
        }

        for dim in 0..self.dims {
            let min = reader.read_f32::<LittleEndian>()?;
            let max = reader.read_f32::<LittleEndian>()?;
            self.bounds[start + dim] = Interval { min, max };
        }

        if flags & FLAG_LEFT != 0 {
            let left = self.decode_node(reader)?;
            self.nodes[idx as usize].left = left;
        }

        if flags & FLAG_RIGHT != 0 {
            let right = self.decode_node(reader)?;
            self.nodes[idx as usize].right = right;
        }

        Ok(idx)
    }

    /// Checks the summary invariants: every internal node's count, sums and
    /// bounds equal the componentwise aggregation of its children's.
    #[doc(hidden)]
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        self.nodes.iter().enumerate().all(|(idx, node)| {
            if node.is_leaf() {
                return true;
            }

            let mut count = 0;
            let mut sums = vec![0.0f64; self.dims];
            let mut bounds = vec![Interval::EMPTY; self.dims];

            for child in [node.left, node.right] {
                if child == NIL {
                    continue;
                }

                count += self.node(child).count;

                for (sum, child_sum) in sums.iter_mut().zip(self.sums_of(child)) {
                    *sum += child_sum;
                }

                for (bound, child_bound) in bounds.iter_mut().zip(self.bounds_of(child)) {
                    bound.merge(child_bound);
                }
            }

            // NOTE: Arena index fits u32, checked on push
            #[allow(clippy::cast_possible_truncation)]
            let idx = idx as u32;

            count == node.count
                && self
                    .sums_of(idx)
                    .iter()
                    .zip(&sums)
                    .all(|(a, b)| (a - b).abs() <= 1e-6 * a.abs().max(1.0))
                && self.bounds_of(idx) == &bounds[..]
        })
    }
}

impl Decode for SummaryTree {
    /// Reads a pre-order serialized tree over `dims` dimensions.
    fn decode_from<R: Read>(reader: &mut R, dims: usize) -> crate::Result<Self> {
        let mut tree = Self::new(dims);
        tree.decode_node(reader)?;
        Ok(tree)
    }
}

impl Encode for SummaryTree {
    // NOTE: The arena is laid out in pre-order, so the record stream is a
    // single pass over it
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let mut flags = 0;
            if node.left != NIL {
                flags |= FLAG_LEFT;
            }
            if node.right != NIL {
                flags |= FLAG_RIGHT;
            }

            writer.write_u8(flags)?;
            writer.write_u32::<LittleEndian>(node.count)?;

            let start = idx * self.dims;

            for sum in &self.sums[start..start + self.dims] {
                writer.write_f64::<LittleEndian>(*sum)?;
            }

            for bound in &self.bounds[start..start + self.dims] {
                writer.write_f32::<LittleEndian>(bound.min)?;
                writer.write_f32::<LittleEndian>(bound.max)?;
            }
        }

        Ok(())
    }
}
