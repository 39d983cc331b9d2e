// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    model::{model_path, reader::read_model, Model},
    Error,
};
use rand::Rng;
use rustc_hash::FxHashMap;
use std::path::Path;

/// In-memory registry of loaded models with a total-memory cap.
///
/// Loading a model first evicts randomly chosen resident models while the
/// running total exceeds the cap, then reads the file and accounts the new
/// model's size. Random eviction is cheap and adequate while model sizes
/// stay fairly uniform; the total may therefore overshoot the cap by at
/// most the newest model until the next load trims it again.
pub struct ModelCache {
    models: FxHashMap<String, Model>,

    /// Loaded names in insertion order; the eviction pool
    loaded: Vec<String>,

    total_memory: u64,
    capacity: u64,
    peak_load: u64,
}

impl ModelCache {
    /// Creates an empty cache with a capacity in bytes.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            models: FxHashMap::default(),
            loaded: Vec::new(),
            total_memory: 0,
            capacity,
            peak_load: 0,
        }
    }

    /// Returns the accounted memory of all resident models, in bytes.
    #[must_use]
    pub fn total_memory(&self) -> u64 {
        self.total_memory
    }

    /// Returns the cache capacity in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Returns the size of the largest model loaded so far, in bytes.
    #[must_use]
    pub fn peak_load(&self) -> u64 {
        self.peak_load
    }

    /// Returns the number of resident models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns `true` if no model is resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns `true` if the model is resident.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Returns a resident model.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Makes a model resident, reading it from `dir` unless it already is.
    ///
    /// Repeated loads of a resident model leave the accounting untouched.
    pub fn load(&mut self, dir: &Path, name: &str, dims: usize) -> crate::Result<()> {
        if self.models.contains_key(name) {
            return Ok(());
        }

        while self.total_memory > self.capacity && !self.loaded.is_empty() {
            self.evict_random();
        }

        if self.total_memory > self.capacity {
            return Err(Error::ResourceExhausted);
        }

        let model = read_model(&model_path(dir, name), name, dims)?;
        let size = model.approximate_size();

        self.total_memory += size;
        self.peak_load = self.peak_load.max(size);
        self.models.insert(name.to_owned(), model);
        self.loaded.push(name.to_owned());

        log::debug!(
            "Loaded model {name:?}: {size} bytes, {} bytes total",
            self.total_memory,
        );

        Ok(())
    }

    fn evict_random(&mut self) {
        let victim = rand::rng().random_range(0..self.loaded.len());
        let name = self.loaded.remove(victim);
        self.evict(&name);
    }

    /// Drops a resident model and its accounted memory.
    pub fn evict(&mut self, name: &str) {
        if let Some(pos) = self.loaded.iter().position(|n| n == name) {
            self.loaded.remove(pos);
        }

        if let Some(model) = self.models.remove(name) {
            self.total_memory -= model.approximate_size();
            log::trace!(
                "Evicted model {name:?}: {} bytes back to {} bytes total",
                model.approximate_size(),
                self.total_memory,
            );
        }
    }

    /// Drops every resident model.
    pub fn clear(&mut self) {
        self.models.clear();
        self.loaded.clear();
        self.total_memory = 0;
    }
}
