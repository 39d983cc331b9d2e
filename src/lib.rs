// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Approximate query processing (AQP) over partitioned summary KD-trees.
//!
//! ##### About
//!
//! This crate answers grouped aggregate queries (COUNT, SUM, AVG) over a
//! fixed-schema numeric dataset, trading bounded error for large speed and
//! memory reductions versus exact scans.
//!
//! The dataset's columns split into *continuous* columns (range-queryable,
//! usable as KD-tree split axes) and *discrete* columns (small integers of
//! known cardinality, used for equality predicates and to partition the
//! dataset). A *model* is one summary KD-tree per distinct combination of
//! discrete values, for a fixed choice of split columns. Models are built
//! once, persisted to disk, and loaded on demand into a memory-governed
//! cache; queries walk the trees and weight each node's precomputed count
//! and per-dimension sums by the fractional overlap between the node's
//! bounding box and the query box.
//!
//! The raw dataset loader, the host driver and any answer formatting are
//! external collaborators; this crate is only the index.
//!
//! # Example usage
//!
//! ```
//! use aqp_tree::{Aggregate, Config, Mode, Schema};
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! // Two continuous columns, one discrete column with 4 distinct values
//! let schema = Schema::new(2, vec![4]);
//! let mut engine = Config::new(folder, schema).open()?;
//!
//! // Three rows in row-major order: (continuous, continuous, discrete)
//! engine.load_dataset(&[
//!     1.0, 10.0, 0.0, //
//!     2.0, 20.0, 1.0, //
//!     3.0, 30.0, 1.0, //
//! ]);
//!
//! // One summary KD-tree per distinct value of column 2
//! engine.build(&[2], 0, 0.5)?;
//!
//! // COUNT grouped by column 2: one entry per group value
//! let answer = engine.query(&[Aggregate::Count], &[], Some(2), Mode::Performance)?;
//! assert_eq!(4, answer.len());
//! assert_eq!(1.0, answer.get(0).unwrap().value);
//! assert_eq!(2.0, answer.get(1).unwrap().value);
//! #
//! # Ok::<(), aqp_tree::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

#[doc(hidden)]
pub mod bound;

#[doc(hidden)]
pub mod cache;

#[doc(hidden)]
pub mod coding;

mod config;

#[doc(hidden)]
pub mod dataset;

mod engine;
mod error;
mod manifest;

#[doc(hidden)]
pub mod model;

mod query;
mod schema;

#[doc(hidden)]
pub mod tree;

pub use {
    config::{Config, DEFAULT_MEMORY_LIMIT},
    engine::Engine,
    error::{Error, Result},
    query::{Aggregate, Answer, GroupAnswer, Mode, Predicate, QueryError},
    schema::Schema,
};
