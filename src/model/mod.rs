// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Model file loading
pub mod reader;

/// Model file writing
pub mod writer;

use crate::tree::SummaryTree;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// A partitioned index: one summary KD-tree per distinct combination of the
/// model's discrete-column values, for a fixed choice of split columns.
///
/// Every stored partition key corresponds to a non-empty set of rows;
/// looking up a key that never occurred in the dataset yields `None`, which
/// queries treat as an empty result.
pub struct Model {
    name: String,
    trees: FxHashMap<u32, SummaryTree>,
    size: u64,
}

impl Model {
    pub(crate) fn new(name: &str, trees: FxHashMap<u32, SummaryTree>) -> Self {
        let size = trees.values().map(SummaryTree::approximate_size).sum();

        Self {
            name: name.to_owned(),
            trees,
            size,
        }
    }

    /// Returns the model's canonical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tree of one partition, if that partition has any rows.
    #[must_use]
    pub fn tree(&self, key: u32) -> Option<&SummaryTree> {
        self.trees.get(&key)
    }

    /// Returns the number of partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.trees.len()
    }

    /// Returns the approximate heap footprint of all trees, in bytes.
    #[must_use]
    pub fn approximate_size(&self) -> u64 {
        self.size
    }
}

/// Returns the canonical model name: column ids joined by `_` in the order
/// they were passed to the build.
#[must_use]
pub fn model_name(columns: &[usize]) -> String {
    columns
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("_")
}

/// Returns the path of a model file inside the model directory.
#[must_use]
pub fn model_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("model_{name}.bin"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn model_name_keeps_column_order() {
        assert_eq!("7_1_0", model_name(&[7, 1, 0]));
        assert_eq!("0", model_name(&[0]));
        assert_eq!("", model_name(&[]));
    }

    #[test]
    fn model_path_layout() {
        assert_eq!(
            Path::new("/models/model_7_1_0.bin"),
            model_path(Path::new("/models"), "7_1_0"),
        );
        assert_eq!(
            Path::new("/models/model_.bin"),
            model_path(Path::new("/models"), ""),
        );
    }
}
