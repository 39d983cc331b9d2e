// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::Model;
use crate::{coding::Decode, tree::SummaryTree};
use byteorder::{LittleEndian, ReadBytesExt};
use rustc_hash::FxHashMap;
use std::{fs::File, io::BufReader, path::Path};

/// Reads a model file back into memory.
///
/// Records are consumed until a clean end-of-file at a key boundary;
/// truncation inside a record surfaces as an error and the partially
/// decoded model is dropped, never registered.
pub fn read_model(path: &Path, name: &str, dims: usize) -> crate::Result<Model> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);

    let mut trees = FxHashMap::<u32, SummaryTree>::default();

    loop {
        let key = match reader.read_u32::<LittleEndian>() {
            Ok(key) => key,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };

        let tree = SummaryTree::decode_from(&mut reader, dims)?;
        trees.insert(key, tree);
    }

    Ok(Model::new(name, trees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bound::Interval,
        dataset::Dataset,
        model::{model_path, writer::ModelWriter},
        tree::builder::{build_tree, depth_cap, BuildParams},
    };
    use test_log::test;

    fn sample_tree(rows: usize, offset: f32) -> SummaryTree {
        let values = (0..rows).map(|i| offset + i as f32).collect::<Vec<_>>();
        let dataset = Dataset::new(values, 1);
        let mut ids = (0..rows as u32).collect::<Vec<_>>();

        build_tree(
            &dataset.continuous(1),
            &mut ids,
            &BuildParams {
                split_dims: &[0],
                max_depth: depth_cap(rows, 0),
                blend: 0.5,
            },
        )
    }

    #[test]
    fn model_write_read_roundtrip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let first = sample_tree(100, 0.0);
        let second = sample_tree(37, 500.0);

        let mut writer = ModelWriter::new(dir.path(), "7")?;
        writer.write_partition(3, &first)?;
        writer.write_partition(11, &second)?;
        writer.write_partition(12, &SummaryTree::new(1))?;
        assert_eq!(2, writer.finish()?);

        let model = read_model(&model_path(dir.path(), "7"), "7", 1)?;

        assert_eq!("7", model.name());
        assert_eq!(2, model.partition_count());
        assert!(model.tree(12).is_none());

        // Node-identical reload
        assert_eq!(Some(&first), model.tree(3));
        assert_eq!(Some(&second), model.tree(11));

        let root = model.tree(11).and_then(SummaryTree::root).expect("non-empty");
        assert_eq!(37, model.tree(11).expect("present").node(root).count());
        assert_eq!(
            &[Interval {
                min: 500.0,
                max: 536.0,
            }],
            model.tree(11).expect("present").bounds_of(root),
        );

        assert_eq!(
            first.approximate_size() + second.approximate_size(),
            model.approximate_size(),
        );

        Ok(())
    }

    #[test]
    fn missing_model_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");

        assert!(matches!(
            read_model(&model_path(dir.path(), "9"), "9", 1),
            Err(crate::Error::Io(_)),
        ));
    }

    #[test]
    fn truncated_model_file_is_error() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;

        let mut writer = ModelWriter::new(dir.path(), "7")?;
        writer.write_partition(0, &sample_tree(64, 0.0))?;
        writer.finish()?;

        let path = model_path(dir.path(), "7");
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..bytes.len() / 2])?;

        assert!(read_model(&path, "7", 1).is_err());
        Ok(())
    }
}
