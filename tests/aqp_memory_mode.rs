mod common;

use aqp_tree::{Aggregate, Config, Mode, Predicate};
use common::{engine_with_data, sample_rows, scan, test_schema};
use test_log::test;

#[test]
fn memory_mode_serves_any_continuous_range() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut engine = engine_with_data(folder.path())?;

    // The large model: every continuous column is a split axis
    engine.build(&[0, 1, 2, 3, 4, 5, 6, 7], -2, 0.5)?;

    let (expected, _) = scan(&sample_rows(), |row| row[7] == 5.0);

    // One discrete predicate, no continuous ones: not the fallback shape,
    // so the query goes to the large model; without a bounding constraint
    // the result is exact
    let answer = engine.query(
        &[Aggregate::Count],
        &[Predicate::equals(7, 5)],
        None,
        Mode::Memory,
    )?;

    assert_eq!(expected as f64, answer.get(0).expect("count").value);

    // Ranges over axes a performance model would not have split on
    let (expected, _) = scan(&sample_rows(), |row| {
        row[7] == 5.0 && (0.0..=6.0).contains(&row[2])
    });

    let answer = engine.query(
        &[Aggregate::Count],
        &[Predicate::equals(7, 5), Predicate::range(2, 0.0, 6.0)],
        None,
        Mode::Memory,
    )?;

    let count = answer.get(0).expect("count").value;
    let expected = expected as f64;

    assert!(
        (count - expected).abs() / expected < 0.1,
        "count {count} too far from {expected}",
    );

    Ok(())
}

#[test]
fn three_discrete_predicates_fall_back_to_discrete_model() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut engine = engine_with_data(folder.path())?;

    engine.build(&[7, 9, 11], -2, 0.5)?;

    // Row 123 exists: 123 % 26, 123 % 53, 123 % 20
    let (expected, sums) = scan(&sample_rows(), |row| {
        row[7] == 19.0 && row[9] == 17.0 && row[11] == 3.0
    });
    assert!(expected > 0);

    let answer = engine.query(
        &[Aggregate::Count, Aggregate::Sum(0)],
        &[
            Predicate::equals(7, 19),
            Predicate::equals(9, 17),
            Predicate::equals(11, 3),
        ],
        None,
        Mode::Memory,
    )?;

    assert_eq!(expected as f64, answer.get(0).expect("count").value);
    assert_eq!(
        (sums[0] * 10.0).round() / 10.0,
        answer.get(1).expect("sum").value,
    );

    // A combination no row has hits a missing partition: empty result
    let (expected, _) = scan(&sample_rows(), |row| {
        row[7] == 0.0 && row[9] == 1.0 && row[11] == 2.0
    });
    assert_eq!(0, expected);

    let answer = engine.query(
        &[Aggregate::Count, Aggregate::Avg(0)],
        &[
            Predicate::equals(7, 0),
            Predicate::equals(9, 1),
            Predicate::equals(11, 2),
        ],
        None,
        Mode::Memory,
    )?;

    assert_eq!(0.0, answer.get(0).expect("count").value);
    assert_eq!(1.0, answer.get(1).expect("avg sentinel").value);

    Ok(())
}

#[test]
fn fallback_can_be_disabled() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;

    let mut engine = Config::new(folder.path(), test_schema())
        .discrete_only_fallback(None)
        .open()?;
    engine.load_dataset(&sample_rows());

    // With the fallback off, the same three predicates address the large
    // continuous model instead
    engine.build(&[0, 1, 2, 3, 4, 5, 6, 7, 9, 11], -2, 0.5)?;

    let (expected, _) = scan(&sample_rows(), |row| {
        row[7] == 19.0 && row[9] == 17.0 && row[11] == 3.0
    });

    let answer = engine.query(
        &[Aggregate::Count],
        &[
            Predicate::equals(7, 19),
            Predicate::equals(9, 17),
            Predicate::equals(11, 3),
        ],
        None,
        Mode::Memory,
    )?;

    assert_eq!(expected as f64, answer.get(0).expect("count").value);

    Ok(())
}
