// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    cache::ModelCache,
    dataset::Dataset,
    manifest::Manifest,
    model::{model_name, writer::ModelWriter},
    query::{
        planner::{self, QueryPlan},
        Aggregate, Answer, GroupAnswer, Mode, Predicate, QueryError,
    },
    tree::{
        aggregate::RangeAggregate,
        builder::{build_tree, depth_cap, BuildParams},
    },
    Config, Error, Schema,
};
use std::path::PathBuf;

/// The AQP engine: owns the schema, the loaded dataset, the model cache and
/// the most recent answer.
///
/// The engine is single-threaded by contract; every entry point takes
/// `&mut self`, so callers serialize through the borrow checker.
pub struct Engine {
    schema: Schema,
    model_dir: PathBuf,
    discrete_only_fallback: Option<usize>,
    manifest: Manifest,
    cache: ModelCache,
    dataset: Option<Dataset>,
    last_answer: Option<Answer>,
}

impl Engine {
    pub(crate) fn open(config: Config) -> crate::Result<Self> {
        std::fs::create_dir_all(&config.path)?;

        log::info!(
            "Opening AQP engine at {:?}, {} columns ({} continuous), {} byte memory cap",
            config.path,
            config.schema.column_count(),
            config.schema.continuous_count(),
            config.memory_limit,
        );

        Ok(Self {
            manifest: Manifest::new(&config.path),
            cache: ModelCache::new(config.memory_limit),
            schema: config.schema,
            model_dir: config.path,
            discrete_only_fallback: config.discrete_only_fallback,
            dataset: None,
            last_answer: None,
        })
    }

    /// Returns the schema the engine was opened with.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the number of rows of the loaded dataset, 0 if none.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.dataset.as_ref().map_or(0, Dataset::row_count)
    }

    /// Returns the accounted memory of all loaded models, in bytes.
    #[must_use]
    pub fn model_memory(&self) -> u64 {
        self.cache.total_memory()
    }

    /// Returns the size of the largest model loaded so far, in bytes.
    #[must_use]
    pub fn peak_model_memory(&self) -> u64 {
        self.cache.peak_load()
    }

    /// Returns the number of loaded models.
    #[must_use]
    pub fn loaded_model_count(&self) -> usize {
        self.cache.len()
    }

    /// Returns the most recent answer, if any query ran since the last
    /// [`Engine::clear`].
    #[must_use]
    pub fn last_answer(&self) -> Option<&Answer> {
        self.last_answer.as_ref()
    }

    /// Replaces the in-memory dataset with `values`, a row-major buffer of
    /// `schema.column_count()` fields per row.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not a whole number of rows.
    pub fn load_dataset(&mut self, values: &[f32]) {
        let dataset = Dataset::new(values.to_vec(), self.schema.column_count());
        log::info!("Loaded dataset: {} rows", dataset.row_count());
        self.dataset = Some(dataset);
    }

    /// Builds one model over the loaded dataset and registers it in the
    /// model list.
    ///
    /// `columns` mixes continuous split axes and discrete partitioning
    /// columns; their order is the model's identity. `depth_adjustment`
    /// offsets each partition's `log2(n)` depth cap (negative values
    /// truncate trees, trading error for memory), `blend` interpolates the
    /// split position between the range-bisecting median (0, accurate) and
    /// the positional median (1, balanced and fast).
    pub fn build(
        &mut self,
        columns: &[usize],
        depth_adjustment: i32,
        blend: f32,
    ) -> crate::Result<()> {
        let dataset = self.dataset.as_ref().ok_or(Error::NoDataset)?;

        for &column in columns {
            if !self.schema.contains(column) {
                return Err(QueryError::UnknownColumn(column).into());
            }
        }

        let mut split_dims = Vec::new();
        let mut discrete = Vec::new();

        for &column in columns {
            if self.schema.is_continuous(column) {
                split_dims.push(column);
            } else {
                discrete.push(column);
            }
        }

        let name = model_name(columns);
        log::info!("Building model {name:?} over {} rows", dataset.row_count());

        // Group rows into partition runs: a stable sort on the discrete
        // tuple alone, row contents tag along via the id indirection
        // NOTE: Row ids fit u32, Dataset::new checked the row count
        #[allow(clippy::cast_possible_truncation)]
        let mut ids = (0..dataset.row_count() as u32).collect::<Vec<_>>();

        ids.sort_by(|&a, &b| {
            discrete
                .iter()
                .map(|&column| {
                    dataset
                        .value(a, column)
                        .total_cmp(&dataset.value(b, column))
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let view = dataset.continuous(self.schema.continuous_count());
        let mut writer = ModelWriter::new(&self.model_dir, &name)?;

        let mut start = 0;
        while start < ids.len() {
            let end = Self::run_end(dataset, &ids, &discrete, start);
            let key = self.partition_key_of_row(dataset, ids[start], &discrete);

            let run = &mut ids[start..end];
            let params = BuildParams {
                split_dims: &split_dims,
                max_depth: depth_cap(run.len(), depth_adjustment),
                blend,
            };

            let tree = build_tree(&view, run, &params);
            writer.write_partition(key, &tree)?;

            start = end;
        }

        let partitions = writer.finish()?;
        self.manifest.add(&name)?;

        log::info!("Built model {name:?}: {partitions} partitions");
        Ok(())
    }

    /// Returns the end (exclusive) of the partition run starting at `start`.
    fn run_end(dataset: &Dataset, ids: &[u32], discrete: &[usize], start: usize) -> usize {
        let mut end = start + 1;

        // NOTE: Exact comparison is intended, discrete values are small
        // integers stored exactly in f32
        #[allow(clippy::float_cmp)]
        while end < ids.len()
            && discrete
                .iter()
                .all(|&column| dataset.value(ids[end], column) == dataset.value(ids[start], column))
        {
            end += 1;
        }

        end
    }

    /// Returns the partition key of one row: its discrete values as a
    /// mixed-radix number, digit order = the model's discrete column order.
    fn partition_key_of_row(&self, dataset: &Dataset, row: u32, discrete: &[usize]) -> u32 {
        let mut key = 0u64;
        let mut weight = 1u64;

        for &column in discrete {
            // NOTE: Discrete fields hold small non-negative integers
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let value = dataset.value(row, column) as u64;

            key += weight * value;
            weight *= u64::from(
                self.schema
                    .cardinality(column)
                    .expect("partitioning columns are discrete"),
            );
        }

        // NOTE: Keys are 4 bytes on disk; radix products beyond that are a
        // schema misconfiguration
        #[allow(clippy::cast_possible_truncation)]
        let key = key as u32;

        key
    }

    /// Warm start: loads the models listed in the model list, in order,
    /// while the memory cap is not reached. A list whose length matches the
    /// resident count is assumed loaded and the call is a no-op.
    pub fn load_models(&mut self) -> crate::Result<()> {
        let listed = self.manifest.read()?;

        if listed.len() == self.cache.len() {
            return Ok(());
        }

        self.cache.clear();

        let mut loaded = 0;
        for name in &listed {
            if self.cache.total_memory() >= self.cache.capacity() {
                break;
            }

            self.cache
                .load(&self.model_dir, name, self.schema.continuous_count())?;
            loaded += 1;
        }

        log::info!("Warm start: loaded {loaded} of {} listed models", listed.len());
        Ok(())
    }

    /// Answers a grouped aggregate query.
    ///
    /// Returns one [`GroupAnswer`] per (group value, aggregation) pair,
    /// group values ascending; without `group_by` a single set of records
    /// with group id `-1`. The engine keeps ownership of the answer; it
    /// stays valid until the next query or [`Engine::clear`].
    ///
    /// An invalid query fails before any model is touched and leaves the
    /// previous answer in place. A query selecting no rows is not an
    /// error: COUNT and SUM yield 0, AVG yields the sentinel `1.0`.
    pub fn query(
        &mut self,
        aggregates: &[Aggregate],
        predicates: &[Predicate],
        group_by: Option<usize>,
        mode: Mode,
    ) -> crate::Result<&Answer> {
        planner::validate(&self.schema, aggregates, predicates, group_by)?;

        let mut plan = planner::plan(
            &self.schema,
            predicates,
            mode,
            self.discrete_only_fallback,
        );

        let answer = match group_by {
            Some(group) => self.grouped_answer(aggregates, &mut plan, group)?,
            None => self.plain_answer(aggregates, &mut plan)?,
        };

        self.last_answer = Some(answer);
        Ok(self.last_answer.as_ref().expect("answer was just stored"))
    }

    fn plain_answer(
        &mut self,
        aggregates: &[Aggregate],
        plan: &mut QueryPlan,
    ) -> crate::Result<Answer> {
        plan.sort_selector();

        let name = plan.model_name();
        self.cache
            .load(&self.model_dir, &name, self.schema.continuous_count())?;
        let model = self.cache.model(&name).expect("model was just loaded");

        let key = plan.partition_key(&self.schema);

        let mut acc = RangeAggregate::new(self.schema.continuous_count());

        if let Some(tree) = model.tree(key) {
            tree.aggregate_range(&plan.bounds, &plan.split_dims, &mut acc);
        }

        let mut answer = Answer::with_capacity(aggregates.len());

        for aggregate in aggregates {
            answer.push(GroupAnswer {
                group: -1,
                value: aggregate.evaluate(&acc),
            });
        }

        Ok(answer)
    }

    fn grouped_answer(
        &mut self,
        aggregates: &[Aggregate],
        plan: &mut QueryPlan,
        group: usize,
    ) -> crate::Result<Answer> {
        let pinned = plan.fixed_value(group);

        if !plan.has_column(group) {
            plan.add_group_column(group);
        }

        plan.sort_selector();

        let cardinality = self
            .schema
            .cardinality(group)
            .expect("grouping column is discrete, validation checked");

        // A grouping column already fixed by a predicate yields exactly its
        // one group; otherwise every value of the column's domain
        let (first, last) = match pinned {
            Some(value) => (value, value + 1),
            None => (0, cardinality),
        };

        let name = plan.model_name();
        self.cache
            .load(&self.model_dir, &name, self.schema.continuous_count())?;
        let model = self.cache.model(&name).expect("model was just loaded");

        let mut acc = RangeAggregate::new(self.schema.continuous_count());
        let mut answer = Answer::with_capacity(((last - first) as usize) * aggregates.len());

        for value in first..last {
            plan.pin(group, value);
            let key = plan.partition_key(&self.schema);

            // NOTE: Cardinalities fit i32, so a group id is -1 or a value
            #[allow(clippy::cast_possible_wrap)]
            let group_id = value as i32;

            acc.reset();

            if let Some(tree) = model.tree(key) {
                tree.aggregate_range(&plan.bounds, &plan.split_dims, &mut acc);
            }

            for aggregate in aggregates {
                answer.push(GroupAnswer {
                    group: group_id,
                    value: aggregate.evaluate(&acc),
                });
            }
        }

        Ok(answer)
    }

    /// Frees the dataset, the last answer and every loaded model.
    pub fn clear(&mut self) {
        self.dataset = None;
        self.last_answer = None;
        self.cache.clear();
        log::debug!("Cleared engine state");
    }
}
