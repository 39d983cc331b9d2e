// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    bound::Bounds,
    model::model_name,
    query::{Aggregate, Mode, Predicate, QueryError},
    schema::Schema,
};

/// Performance-mode models split on at most this many continuous axes
pub(crate) const MAX_SPLIT_AXES: usize = 3;

/// One model-selector entry: a column that is part of the model identity,
/// either fixed to a discrete value or left open (a continuous split axis
/// or a not-yet-pinned grouping column).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Selector {
    pub column: usize,
    pub value: Option<u32>,
}

/// The extracted form of a query: the bounding box over all continuous
/// dimensions, the split axes of the model to consult, and the selector
/// that names the model and encodes the partition key.
#[derive(Debug)]
pub(crate) struct QueryPlan {
    pub bounds: Bounds,
    pub split_dims: Vec<usize>,
    selector: Vec<Selector>,
}

impl QueryPlan {
    /// Returns the fixed value of a column, if the selector pins one.
    pub fn fixed_value(&self, column: usize) -> Option<u32> {
        self.selector
            .iter()
            .find(|s| s.column == column)
            .and_then(|s| s.value)
    }

    /// Returns `true` if the selector mentions the column at all.
    pub fn has_column(&self, column: usize) -> bool {
        self.selector.iter().any(|s| s.column == column)
    }

    /// Appends an unfixed selector entry for the grouping column.
    pub fn add_group_column(&mut self, column: usize) {
        self.selector.push(Selector {
            column,
            value: None,
        });
    }

    /// Canonicalizes the selector by column id; the resulting column order
    /// determines the model name and the partition-key digit order.
    pub fn sort_selector(&mut self) {
        self.selector.sort_by_key(|s| s.column);
    }

    /// Fixes a selector column to a concrete value.
    pub fn pin(&mut self, column: usize, value: u32) {
        if let Some(entry) = self.selector.iter_mut().find(|s| s.column == column) {
            entry.value = Some(value);
        }
    }

    /// Returns the canonical name of the model this plan selects.
    pub fn model_name(&self) -> String {
        let columns = self.selector.iter().map(|s| s.column).collect::<Vec<_>>();
        model_name(&columns)
    }

    /// Returns the partition key: the fixed discrete values as a
    /// mixed-radix number with the columns' cardinalities as digit weights,
    /// least significant first. Unfixed entries are continuous split axes
    /// and contribute nothing.
    pub fn partition_key(&self, schema: &Schema) -> u32 {
        let mut key = 0u64;
        let mut weight = 1u64;

        for entry in &self.selector {
            if let Some(value) = entry.value {
                key += weight * u64::from(value);
                weight *= u64::from(
                    schema
                        .cardinality(entry.column)
                        .expect("fixed selector columns are discrete"),
                );
            }
        }

        // NOTE: Keys are 4 bytes on disk; radix products beyond that are a
        // schema misconfiguration
        #[allow(clippy::cast_possible_truncation)]
        let key = key as u32;

        key
    }
}

/// Rejects queries that reference columns the schema does not allow,
/// before any model or tree is touched.
pub(crate) fn validate(
    schema: &Schema,
    aggregates: &[Aggregate],
    predicates: &[Predicate],
    group_by: Option<usize>,
) -> Result<(), QueryError> {
    for aggregate in aggregates {
        if let Some(column) = aggregate.column() {
            if !schema.contains(column) {
                return Err(QueryError::UnknownColumn(column));
            }

            if !schema.is_continuous(column) {
                return Err(QueryError::AggregateOnDiscrete(column));
            }
        }
    }

    for predicate in predicates {
        if !schema.contains(predicate.column) {
            return Err(QueryError::UnknownColumn(predicate.column));
        }
    }

    if let Some(column) = group_by {
        if !schema.contains(column) {
            return Err(QueryError::UnknownColumn(column));
        }

        if schema.is_continuous(column) {
            return Err(QueryError::GroupByContinuous(column));
        }
    }

    Ok(())
}

/// Extracts the bounding box, split axes and model selector from the
/// predicate list.
pub(crate) fn plan(
    schema: &Schema,
    predicates: &[Predicate],
    mode: Mode,
    discrete_only_fallback: Option<usize>,
) -> QueryPlan {
    let dims = schema.continuous_count();

    let mut bounds = Bounds::unconstrained(dims);
    let mut split_dims = Vec::new();
    let mut selector = Vec::new();

    match mode {
        Mode::Performance => {
            for predicate in predicates {
                if schema.is_continuous(predicate.column) {
                    bounds.set(predicate.column, predicate.min, predicate.max);

                    if split_dims.len() < MAX_SPLIT_AXES {
                        split_dims.push(predicate.column);
                        selector.push(Selector {
                            column: predicate.column,
                            value: None,
                        });
                    }
                } else {
                    selector.push(Selector {
                        column: predicate.column,
                        value: Some(discrete_value(predicate)),
                    });
                }
            }
        }
        Mode::Memory => {
            split_dims.extend(0..dims);
            selector.extend((0..dims).map(|column| Selector {
                column,
                value: None,
            }));

            let mut continuous_predicates = 0;

            for predicate in predicates {
                if schema.is_continuous(predicate.column) {
                    bounds.set(predicate.column, predicate.min, predicate.max);
                    continuous_predicates += 1;
                } else {
                    selector.push(Selector {
                        column: predicate.column,
                        value: Some(discrete_value(predicate)),
                    });
                }
            }

            // A purely discrete query of the configured width selects a
            // discrete-partition model instead of the large continuous one
            if continuous_predicates == 0 && discrete_only_fallback == Some(predicates.len()) {
                selector.drain(..dims);
                split_dims.clear();
            }
        }
    }

    QueryPlan {
        bounds,
        split_dims,
        selector,
    }
}

fn discrete_value(predicate: &Predicate) -> u32 {
    // NOTE: Discrete predicates are equality constraints, the value rides
    // in the lower bound
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = predicate.min as u32;

    value
}
