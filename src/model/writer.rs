// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::model_path;
use crate::{coding::Encode, tree::SummaryTree};
use byteorder::{LittleEndian, WriteBytesExt};
use std::{
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Streams the `(partition key, tree)` records of one model to disk.
///
/// Records go into a temporary file in the model directory first and are
/// atomically persisted as `model_<name>.bin` by [`ModelWriter::finish`],
/// so a crashed build never leaves a half-written model behind.
pub struct ModelWriter {
    writer: BufWriter<NamedTempFile>,
    path: PathBuf,
    partition_count: usize,
}

impl ModelWriter {
    /// Creates a writer for the model `name` inside `dir`.
    pub fn new(dir: &Path, name: &str) -> crate::Result<Self> {
        let file = NamedTempFile::new_in(dir)?;

        Ok(Self {
            writer: BufWriter::new(file),
            path: model_path(dir, name),
            partition_count: 0,
        })
    }

    /// Appends one partition record. Empty trees are skipped, every stored
    /// partition summarizes at least one row.
    pub fn write_partition(&mut self, key: u32, tree: &SummaryTree) -> crate::Result<()> {
        if tree.is_empty() {
            return Ok(());
        }

        self.writer.write_u32::<LittleEndian>(key)?;
        tree.encode_into(&mut self.writer)?;
        self.partition_count += 1;

        Ok(())
    }

    /// Flushes and persists the model file, returning the partition count.
    pub fn finish(self) -> crate::Result<usize> {
        let mut file = self
            .writer
            .into_inner()
            .map_err(std::io::IntoInnerError::into_error)?;

        file.flush()?;
        file.as_file().sync_all()?;

        log::debug!(
            "Persisting model file {:?} ({} partitions)",
            self.path,
            self.partition_count,
        );

        file.persist(&self.path).map_err(|e| e.error)?;

        Ok(self.partition_count)
    }
}
