use super::*;
use crate::automl::params::Param;
use crate::automl::search::{Domain, HyperparameterSpec};
use crate::data::DataFrame;
use crate::primitives::Vector;

fn blobs() -> Task {
    let mut x1 = Vec::new();
    let mut x2 = Vec::new();
    let mut y = Vec::new();
    for i in 0..36 {
        let class = i % 3;
        x1.push(class as f32 * 4.0 + (i % 5) as f32 * 0.25);
        x2.push((i % 4) as f32 * 0.3 - class as f32);
        y.push(class as f32);
    }
    let df = DataFrame::new(vec![
        ("x1".to_string(), Vector::from_vec(x1)),
        ("x2".to_string(), Vector::from_vec(x2)),
        ("class".to_string(), Vector::from_vec(y)),
    ])
    .expect("frame");
    Task::classification("blobs", df, "class").expect("task")
}

fn knn_wrapper() -> TuneWrapper {
    let space = SearchSpace::new(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 5))])
        .expect("space");
    TuneWrapper::new(Learner::Knn, space).with_inner(Resampling::cv(3).stratified())
}

fn forest_wrapper() -> TuneWrapper {
    let space = SearchSpace::new(vec![HyperparameterSpec::new(
        Param::NTree,
        Domain::discrete([15_i64]),
    )])
    .expect("space");
    TuneWrapper::new(Learner::RandomForest, space)
        .with_strategy(SearchStrategy::grid())
        .with_inner(Resampling::holdout(0.7).stratified())
}

#[test]
fn test_empty_learner_list_rejected() {
    let err = BenchmarkRunner::default()
        .run(&blobs(), &[], &Resampling::cv(3))
        .expect_err("no learners");
    assert!(matches!(err, TuneError::InvalidConfig(_)));
}

#[test]
fn test_invalid_outer_resampling_rejected() {
    let err = BenchmarkRunner::default()
        .run(&blobs(), &[knn_wrapper()], &Resampling::cv(1))
        .expect_err("one fold");
    assert!(matches!(err, TuneError::InvalidConfig(_)));
}

#[test]
fn test_stratified_holdout_outer_split() {
    let runner = BenchmarkRunner::default();
    // 12 rows per class: 12 * 0.98 rounds to 12, leaving no outer test rows
    let err = runner
        .run(&blobs(), &[knn_wrapper()], &Resampling::holdout(0.98).stratified())
        .expect_err("empty outer test side");
    assert!(matches!(err, TuneError::InvalidConfig(_)));

    let report = runner
        .run(&blobs(), &[knn_wrapper()], &Resampling::holdout(0.75).stratified())
        .expect("benchmark");
    let row = &report.rows[0];
    assert!(row.succeeded());
    assert_eq!(row.fold_scores.len(), 1);
    assert_eq!(row.tuned.len(), 1);
}

#[test]
fn test_rows_follow_wrapper_order() {
    let report = BenchmarkRunner::new(TuningConfig::default().with_seed(2))
        .run(
            &blobs(),
            &[knn_wrapper(), forest_wrapper()],
            &Resampling::cv(3).stratified(),
        )
        .expect("benchmark");

    assert_eq!(report.rows.len(), 2);
    assert_eq!(report.rows[0].learner, "knn");
    assert_eq!(report.rows[1].learner, "random_forest");
    assert_eq!(report.measure, Measure::Mmce);
    for row in &report.rows {
        assert!(row.succeeded());
        assert_eq!(row.fold_scores.len(), 3);
        assert_eq!(row.tuned.len(), 3);
        let mean = row.fold_scores.iter().sum::<f64>() / 3.0;
        assert!((row.aggregate - mean).abs() < 1e-12);
        assert!(row.aggregate < 0.2);
    }
    assert!(report.best().is_some());
}

#[test]
fn test_benchmark_is_deterministic() {
    let runner = BenchmarkRunner::new(TuningConfig::default().with_seed(17));
    let wrappers = [knn_wrapper(), forest_wrapper()];
    let outer = Resampling::repeated_cv(3, 2).stratified();
    let first = runner.run(&blobs(), &wrappers, &outer).expect("first");
    let second = runner.run(&blobs(), &wrappers, &outer).expect("second");
    assert_eq!(first, second);
}

#[test]
fn test_failure_is_isolated_to_its_row() {
    let broken = TuneWrapper::new(
        Learner::Knn,
        SearchSpace::new(vec![HyperparameterSpec::new(
            Param::Shrinkage,
            Domain::continuous(0.01, 0.1),
        )])
        .expect("space"),
    )
    .with_id("knn-broken");

    let report = BenchmarkRunner::default()
        .run(
            &blobs(),
            &[broken, knn_wrapper()],
            &Resampling::cv(3).stratified(),
        )
        .expect("benchmark still runs");

    let failed = report.row("knn-broken").expect("row");
    let failure = failed.failure.as_ref().expect("failure recorded");
    assert_eq!(failure.split, 0);
    assert!(failure.message.contains("shrinkage"));
    assert!(failed.aggregate.is_nan());

    let healthy = report.row("knn").expect("row");
    assert!(healthy.succeeded());
    assert_eq!(report.best().map(|r| r.learner.as_str()), Some("knn"));
}

#[test]
fn test_report_renders_and_serialises() {
    let report = BenchmarkRunner::default()
        .run(&blobs(), &[knn_wrapper()], &Resampling::holdout(0.75).stratified())
        .expect("benchmark");

    let table = report.to_string();
    assert!(table.contains("knn"));
    assert!(table.contains("mmce"));

    let json = report.to_json().expect("json");
    let back: BenchmarkReport = serde_json::from_str(&json).expect("round trip");
    assert_eq!(back.rows[0].learner, "knn");
}
