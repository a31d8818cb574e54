//! Integration tests for aprender-tune.
//!
//! These tests verify end-to-end workflows: load, tune, refit, evaluate and
//! benchmark.

use std::io::Write;

use aprender_tune::prelude::*;

/// Regression data with a smooth signal plus a deterministic wiggle.
fn housing_like_csv() -> String {
    let mut csv = String::from("rooms,age,price\n");
    for i in 0..60 {
        let rooms = 3.0 + (i % 7) as f32 * 0.5;
        let age = (i * 13 % 50) as f32;
        let price = 10.0 * rooms - 0.2 * age + ((i * 7 % 5) as f32 - 2.0) * 0.5;
        csv.push_str(&format!("{rooms},{age},{price}\n"));
    }
    csv
}

fn load_task() -> Task {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(housing_like_csv().as_bytes()).expect("write csv");
    let df = DataFrame::from_csv_path(file.path()).expect("load csv");
    Task::regression("housing", df, "price").expect("task")
}

fn iris_like() -> Task {
    let mut cols: Vec<Vec<f32>> = vec![Vec::new(); 5];
    for i in 0..45 {
        let class = i / 15;
        let jitter = (i % 5) as f32 * 0.1;
        cols[0].push(1.0 + 2.0 * class as f32 + jitter);
        cols[1].push(3.0 - class as f32 + (i % 3) as f32 * 0.1);
        cols[2].push(0.5 * class as f32 + (i % 7) as f32 * 0.05);
        cols[3].push((i % 4) as f32 * 0.2);
        cols[4].push(class as f32 + 1.0);
    }
    let names = ["sepal", "width", "petal", "noise", "species"];
    let df = DataFrame::new(
        names
            .iter()
            .zip(cols)
            .map(|(n, c)| ((*n).to_string(), Vector::from_vec(c)))
            .collect(),
    )
    .expect("frame");
    Task::classification("iris-like", df, "species").expect("task")
}

#[test]
fn test_knn_grid_over_k_evaluates_twelve_candidates() {
    let task = load_task();
    let pipeline = TuningPipeline::new(TuningConfig::default().with_seed(11));
    let space = pipeline
        .define_search_space(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 12))])
        .expect("space");

    let result = pipeline
        .tune(&task, Learner::Knn, &space, SearchStrategy::grid(), &Resampling::cv(5))
        .expect("tune");

    assert_eq!(result.n_candidates(), 12);
    let ks: Vec<i64> = result
        .trace
        .iter()
        .filter_map(|t| t.assignment.get_i64(Param::K))
        .collect();
    assert_eq!(ks, (1..=12).collect::<Vec<_>>());

    let min = result
        .trace
        .iter()
        .map(|t| t.mean_error)
        .fold(f64::INFINITY, f64::min);
    let smallest_k_at_min = result
        .trace
        .iter()
        .find(|t| t.mean_error == min)
        .and_then(|t| t.assignment.get_i64(Param::K));
    assert_eq!(result.best.get_i64(Param::K), smallest_k_at_min);
    assert!(result.trace.iter().any(|t| t.assignment == result.best));
}

#[test]
fn test_train_final_and_evaluate_on_training_rows() {
    let pipeline = TuningPipeline::default();
    for task in [load_task(), iris_like()] {
        for learner in Learner::ALL.into_iter().filter(|l| l.supports(task.kind())) {
            let model = pipeline
                .train_final(&task, learner, &Assignment::new())
                .expect("train");
            let metrics = pipeline.evaluate_out_of_sample(&model, task.data());
            assert!(
                !matches!(metrics, Err(TuneError::SchemaMismatch { .. })),
                "{learner} on {}",
                task.id()
            );
            assert!(metrics.is_ok());
        }
    }
}

#[test]
fn test_predict_single_new_row() {
    let task = iris_like();
    let pipeline = TuningPipeline::default();
    let space = pipeline
        .define_search_space(vec![HyperparameterSpec::new(
            Param::RegParam,
            Domain::continuous(0.0, 0.5),
        )])
        .expect("space");
    let result = pipeline
        .tune(
            &task,
            Learner::Qda,
            &space,
            SearchStrategy::grid_with_resolution(3),
            &Resampling::cv(3).stratified(),
        )
        .expect("tune");
    let model = pipeline
        .train_final(&task, Learner::Qda, &result.best)
        .expect("train");

    let row = DataFrame::new(vec![
        ("noise".to_string(), Vector::from_slice(&[0.4])),
        ("petal".to_string(), Vector::from_slice(&[0.6])),
        ("width".to_string(), Vector::from_slice(&[2.0])),
        ("sepal".to_string(), Vector::from_slice(&[3.1])),
    ])
    .expect("row");
    let prediction = pipeline.predict(&model, &row).expect("predict");
    assert_eq!(prediction.len(), 1);
    assert!(model.classes().contains(&prediction[0]));
}

#[test]
fn test_random_search_over_boosting() {
    let task = load_task();
    let pipeline = TuningPipeline::new(TuningConfig::default().with_seed(4).with_measure(Measure::Mae));
    let space = pipeline
        .define_search_space(vec![
            HyperparameterSpec::new(Param::NTrees, Domain::integer(10, 40)),
            HyperparameterSpec::new(Param::Shrinkage, Domain::continuous_log(0.01, 0.3)),
            HyperparameterSpec::new(Param::InteractionDepth, Domain::discrete([1_i64, 2])),
        ])
        .expect("space");
    let result = pipeline
        .tune(
            &task,
            Learner::GradientBoosting,
            &space,
            SearchStrategy::random(5),
            &Resampling::holdout(0.7),
        )
        .expect("tune");
    assert_eq!(result.n_candidates(), 5);
    assert_eq!(result.measure, Measure::Mae);
    assert!(result.best_error.is_finite());
}

#[test]
fn test_benchmark_compares_learners() {
    let task = iris_like();
    let knn = TuneWrapper::new(
        Learner::Knn,
        SearchSpace::new(vec![HyperparameterSpec::new(Param::K, Domain::integer(1, 5))])
            .expect("space"),
    )
    .with_inner(Resampling::cv(3).stratified());
    let lda = TuneWrapper::new(Learner::Lda, SearchSpace::empty())
        .with_inner(Resampling::cv(3).stratified());

    let runner = BenchmarkRunner::new(TuningConfig::default().with_seed(8));
    let outer = Resampling::cv(3).stratified();
    let report = runner.run(&task, &[knn.clone(), lda.clone()], &outer).expect("benchmark");
    let again = runner.run(&task, &[knn, lda], &outer).expect("benchmark");

    assert_eq!(report, again);
    assert_eq!(report.rows.len(), 2);
    assert!(report.rows.iter().all(|r| r.succeeded()));
    assert!(report.to_string().contains("lda"));
}

#[test]
fn test_missing_csv_column_is_schema_mismatch() {
    let task = load_task();
    let pipeline = TuningPipeline::default();
    let model = pipeline
        .train_final(&task, Learner::RandomForest, &Assignment::new().with(Param::NTree, 20_i64))
        .expect("train");

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"rooms,price\n4.0,38.0\n").expect("write csv");
    let holdout = DataFrame::from_csv_path(file.path()).expect("load");
    match pipeline.evaluate_out_of_sample(&model, &holdout) {
        Err(TuneError::SchemaMismatch { missing }) => assert_eq!(missing, vec!["age".to_string()]),
        other => panic!("unexpected outcome {other:?}"),
    }
}
