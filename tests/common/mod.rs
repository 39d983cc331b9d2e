use aqp_tree::{Config, Engine, Schema};
use std::path::Path;

/// Total column count of the test schema
pub const COLUMNS: usize = 12;

/// Row count of the sample dataset
pub const ROWS: usize = 1_000;

/// The reference schema: continuous columns 0-6, discrete columns 7-11.
#[must_use]
pub fn test_schema() -> Schema {
    Schema::new(7, vec![26, 363, 53, 366, 53])
}

/// Deterministic sample dataset in row-major order.
///
/// Continuous: col 0 covers 0..=100, col 1 covers 0..3 in half steps,
/// col 2 covers 0..13, cols 3-6 are zero. Discrete: residues of the row
/// index, so reference aggregates are cheap to compute by scanning.
#[must_use]
pub fn sample_rows() -> Vec<f32> {
    let mut values = Vec::with_capacity(ROWS * COLUMNS);

    for i in 0..ROWS {
        values.push((i % 101) as f32);
        values.push((i % 7) as f32 * 0.5);
        values.push((i % 13) as f32);
        values.push(0.0);
        values.push(0.0);
        values.push(0.0);
        values.push(0.0);

        values.push((i % 26) as f32);
        values.push((i % 50) as f32);
        values.push((i % 53) as f32);
        values.push((i % 11) as f32);
        values.push((i % 20) as f32);
    }

    values
}

/// Opens an engine over `dir` with the test schema and the sample dataset.
pub fn engine_with_data(dir: &Path) -> aqp_tree::Result<Engine> {
    let mut engine = Config::new(dir, test_schema()).open()?;
    engine.load_dataset(&sample_rows());
    Ok(engine)
}

/// Scans the sample dataset, returning `(count, per-dimension sums)` over
/// the rows the filter accepts.
pub fn scan(values: &[f32], filter: impl Fn(&[f32]) -> bool) -> (usize, Vec<f64>) {
    let mut count = 0;
    let mut sums = vec![0.0f64; 7];

    for row in values.chunks(COLUMNS) {
        if filter(row) {
            count += 1;
            for (sum, value) in sums.iter_mut().zip(row) {
                *sum += f64::from(*value);
            }
        }
    }

    (count, sums)
}
