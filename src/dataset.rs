// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// The loaded dataset: `row_count` rows of `columns` numeric fields each,
/// in row-major order.
///
/// Discrete column values are stored as `f32` like everything else; they
/// are small non-negative integers, which `f32` represents exactly.
pub struct Dataset {
    values: Vec<f32>,
    columns: usize,
}

impl Dataset {
    /// Wraps a row-major value buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not a whole number of rows.
    #[must_use]
    pub fn new(values: Vec<f32>, columns: usize) -> Self {
        assert!(columns > 0, "dataset needs at least one column");
        assert_eq!(
            0,
            values.len() % columns,
            "dataset buffer is not a whole number of rows",
        );

        Self { values, columns }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.values.len() / self.columns
    }

    /// Returns one field of one row.
    #[must_use]
    pub fn value(&self, row: u32, column: usize) -> f32 {
        self.values[row as usize * self.columns + column]
    }

    /// Returns a view restricted to the first `dims` (continuous) columns.
    #[must_use]
    pub fn continuous(&self, dims: usize) -> ContinuousView<'_> {
        debug_assert!(dims <= self.columns);

        ContinuousView {
            values: &self.values,
            stride: self.columns,
            dims,
        }
    }
}

/// Read-only view of the continuous columns of a [`Dataset`].
#[derive(Clone, Copy)]
pub struct ContinuousView<'a> {
    values: &'a [f32],
    stride: usize,
    dims: usize,
}

impl ContinuousView<'_> {
    /// Returns the number of continuous dimensions.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Returns the value of one row in one continuous dimension.
    #[must_use]
    pub fn value(&self, row: u32, dim: usize) -> f32 {
        debug_assert!(dim < self.dims);
        self.values[row as usize * self.stride + dim]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn dataset_row_major_access() {
        let dataset = Dataset::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3);

        assert_eq!(2, dataset.row_count());
        assert_eq!(1.0, dataset.value(0, 0));
        assert_eq!(6.0, dataset.value(1, 2));

        let view = dataset.continuous(2);
        assert_eq!(2, view.dims());
        assert_eq!(5.0, view.value(1, 1));
    }

    #[test]
    #[should_panic(expected = "whole number of rows")]
    fn dataset_rejects_ragged_buffer() {
        let _dataset = Dataset::new(vec![1.0, 2.0, 3.0, 4.0], 3);
    }
}
