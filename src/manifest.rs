// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// File name of the model-list registry inside the model directory
pub const MODEL_LIST_FILE: &str = "model_list.txt";

/// Append-only registry of built model names, one per line.
///
/// Warm starts replay this list in order. A missing file reads as an empty
/// list; duplicate lines collapse to their first appearance.
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    pub(crate) fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(MODEL_LIST_FILE),
        }
    }

    /// Returns the listed model names in first-appearance order.
    pub fn read(&self) -> crate::Result<Vec<String>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::<String>::new();

        for name in content.split_whitespace() {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }

        Ok(names)
    }

    /// Appends a model name unless it is already listed.
    ///
    /// The zero-column model has an empty name, which a whitespace-separated
    /// list cannot represent; it is never listed and loads on demand only.
    pub fn add(&self, name: &str) -> crate::Result<()> {
        if name.is_empty() || self.read()?.iter().any(|n| n == name) {
            return Ok(());
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        writeln!(file, "{name}")?;
        file.sync_all()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn manifest_missing_file_reads_empty() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest = Manifest::new(dir.path());

        assert!(manifest.read()?.is_empty());
        Ok(())
    }

    #[test]
    fn manifest_appends_in_order() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let manifest = Manifest::new(dir.path());

        manifest.add("7_1_0")?;
        manifest.add("9")?;
        manifest.add("7_1_0")?;
        manifest.add("")?;

        assert_eq!(vec!["7_1_0".to_owned(), "9".to_owned()], manifest.read()?);
        Ok(())
    }
}
