// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{Engine, Schema};
use std::path::{Path, PathBuf};

/// Default memory cap for loaded models (10 GiB)
pub const DEFAULT_MEMORY_LIMIT: u64 = 10 * 1_024 * 1_024 * 1_024;

const DEFAULT_DISCRETE_ONLY_FALLBACK: usize = 3;

/// Engine configuration builder
#[derive(Clone)]
pub struct Config {
    /// Directory holding the model files and the model list
    pub(crate) path: PathBuf,

    /// Column classification of the dataset
    pub(crate) schema: Schema,

    /// Memory cap for loaded models, in bytes
    pub(crate) memory_limit: u64,

    /// Memory-mode special case: a query with no continuous predicate and
    /// exactly this many predicates selects a pure discrete-partition model
    pub(crate) discrete_only_fallback: Option<usize>,
}

impl Config {
    /// Creates a configuration for the given model directory and schema.
    #[must_use]
    pub fn new<P: AsRef<Path>>(path: P, schema: Schema) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            schema,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            discrete_only_fallback: Some(DEFAULT_DISCRETE_ONLY_FALLBACK),
        }
    }

    /// Sets the memory cap for loaded models, in bytes.
    ///
    /// Default = 10 GiB
    #[must_use]
    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = bytes;
        self
    }

    /// Sets the memory-mode fallback width: a memory-mode query carrying no
    /// continuous predicate and exactly `predicates` predicates in total is
    /// answered from a pure discrete-partition model. `None` disables the
    /// fallback.
    ///
    /// Default = `Some(3)`
    #[must_use]
    pub fn discrete_only_fallback(mut self, predicates: Option<usize>) -> Self {
        self.discrete_only_fallback = predicates;
        self
    }

    /// Opens an engine: creates the model directory if needed and loads the
    /// schema. Idempotent, an existing directory is reused.
    pub fn open(self) -> crate::Result<Engine> {
        Engine::open(self)
    }
}
