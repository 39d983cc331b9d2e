mod common;

use aqp_tree::{Aggregate, Config, Mode, Predicate, QueryError};
use common::{engine_with_data, test_schema};
use test_log::test;

#[test]
fn reopened_engine_answers_identically() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;

    let mut engine = engine_with_data(folder.path())?;
    engine.build(&[0, 7], -3, 0.4)?;

    let aggregates = [Aggregate::Count, Aggregate::Sum(0), Aggregate::Avg(1)];
    let predicates = [Predicate::range(0, 10.0, 60.0), Predicate::equals(7, 3)];

    let original = engine
        .query(&aggregates, &predicates, None, Mode::Performance)?
        .clone();

    // A fresh engine over the same directory reads the same trees back,
    // bit for bit
    let mut engine = Config::new(folder.path(), test_schema()).open()?;
    let reloaded = engine.query(&aggregates, &predicates, None, Mode::Performance)?;

    assert_eq!(&original, reloaded);

    Ok(())
}

#[test]
fn warm_start_loads_listed_models() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;

    let mut engine = engine_with_data(folder.path())?;
    engine.build(&[7], -2, 0.5)?;
    engine.build(&[9], -2, 0.5)?;

    let mut engine = Config::new(folder.path(), test_schema()).open()?;
    assert_eq!(0, engine.loaded_model_count());

    engine.load_models()?;
    assert_eq!(2, engine.loaded_model_count());

    // Matching resident count makes the warm start a no-op
    let memory = engine.model_memory();
    engine.load_models()?;
    assert_eq!(memory, engine.model_memory());

    Ok(())
}

#[test]
fn rebuilding_a_model_does_not_grow_the_list() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;

    let mut engine = engine_with_data(folder.path())?;
    engine.build(&[7], -2, 0.5)?;
    engine.build(&[7], -1, 0.9)?;

    let mut engine = Config::new(folder.path(), test_schema()).open()?;
    engine.load_models()?;

    assert_eq!(1, engine.loaded_model_count());

    Ok(())
}

#[test]
fn invalid_query_fails_without_touching_state() -> aqp_tree::Result<()> {
    let folder = tempfile::tempdir()?;
    let mut engine = engine_with_data(folder.path())?;

    engine.build(&[7], -2, 0.5)?;

    let good = engine
        .query(
            &[Aggregate::Count],
            &[Predicate::equals(7, 3)],
            None,
            Mode::Performance,
        )?
        .clone();

    // Aggregating over a discrete column is rejected up front...
    let result = engine.query(&[Aggregate::Sum(7)], &[], None, Mode::Performance);
    assert!(matches!(
        result,
        Err(aqp_tree::Error::InvalidQuery(
            QueryError::AggregateOnDiscrete(7),
        )),
    ));

    // ...same for unknown columns and continuous grouping columns
    assert!(engine
        .query(&[Aggregate::Count], &[Predicate::range(42, 0.0, 1.0)], None, Mode::Performance)
        .is_err());
    assert!(engine
        .query(&[Aggregate::Count], &[], Some(0), Mode::Performance)
        .is_err());

    // The previous answer stays in place
    assert_eq!(Some(&good), engine.last_answer());

    Ok(())
}
