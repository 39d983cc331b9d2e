// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Classification of the dataset's columns.
///
/// The first `continuous` columns are real-valued: they may appear in range
/// predicates, serve as KD-tree split axes and are the only columns that can
/// be summed or averaged. Every remaining column is discrete: its values are
/// the integers `0..cardinality`, it only supports equality predicates, and
/// it partitions the dataset into one summary tree per distinct value
/// combination.
///
/// The schema is configuration, set once when the engine is opened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    continuous: usize,

    /// One entry per discrete column, in column order
    cardinalities: Vec<u32>,
}

impl Schema {
    /// Creates a schema with `continuous` leading range-queryable columns,
    /// followed by one discrete column per entry of `cardinalities`.
    ///
    /// # Panics
    ///
    /// Panics if a discrete column has cardinality 0.
    #[must_use]
    pub fn new(continuous: usize, cardinalities: Vec<u32>) -> Self {
        assert!(
            cardinalities.iter().all(|&v| v > 0),
            "discrete columns need cardinality >= 1",
        );

        Self {
            continuous,
            cardinalities,
        }
    }

    /// Returns the total number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.continuous + self.cardinalities.len()
    }

    /// Returns the number of continuous columns.
    #[must_use]
    pub fn continuous_count(&self) -> usize {
        self.continuous
    }

    /// Returns the number of discrete columns.
    #[must_use]
    pub fn discrete_count(&self) -> usize {
        self.cardinalities.len()
    }

    /// Returns `true` if the column is continuous.
    ///
    /// Out-of-range column ids are neither continuous nor discrete.
    #[must_use]
    pub fn is_continuous(&self, column: usize) -> bool {
        column < self.continuous
    }

    /// Returns `true` if the column id exists in this schema.
    #[must_use]
    pub fn contains(&self, column: usize) -> bool {
        column < self.column_count()
    }

    /// Returns the number of distinct values of a discrete column,
    /// or `None` for continuous (and unknown) columns.
    #[must_use]
    pub fn cardinality(&self, column: usize) -> Option<u32> {
        column
            .checked_sub(self.continuous)
            .and_then(|idx| self.cardinalities.get(idx))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn schema_classification() {
        let schema = Schema::new(7, vec![26, 363, 53, 366, 53]);

        assert_eq!(12, schema.column_count());
        assert_eq!(7, schema.continuous_count());
        assert_eq!(5, schema.discrete_count());

        assert!(schema.is_continuous(0));
        assert!(schema.is_continuous(6));
        assert!(!schema.is_continuous(7));
        assert!(!schema.is_continuous(11));

        assert_eq!(None, schema.cardinality(0));
        assert_eq!(Some(26), schema.cardinality(7));
        assert_eq!(Some(53), schema.cardinality(11));
        assert_eq!(None, schema.cardinality(12));

        assert!(schema.contains(11));
        assert!(!schema.contains(12));
    }

    #[test]
    #[should_panic(expected = "cardinality")]
    fn schema_rejects_empty_domain() {
        let _schema = Schema::new(2, vec![4, 0]);
    }
}
