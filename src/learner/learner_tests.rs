use super::*;

fn frame(columns: &[(&str, Vec<f32>)]) -> DataFrame {
    DataFrame::new(
        columns
            .iter()
            .map(|(name, values)| ((*name).to_string(), Vector::from_slice(values)))
            .collect(),
    )
    .expect("frame")
}

/// Two separated groups on `x1`, labelled 3 and 7.
fn two_class_task() -> Task {
    let x1: Vec<f32> = (0..20)
        .map(|i| if i < 10 { i as f32 * 0.1 } else { 5.0 + i as f32 * 0.1 })
        .collect();
    let x2: Vec<f32> = (0..20).map(|i| (i % 4) as f32).collect();
    let y: Vec<f32> = (0..20).map(|i| if i < 10 { 3.0 } else { 7.0 }).collect();
    Task::classification("groups", frame(&[("x1", x1), ("x2", x2), ("y", y)]), "y")
        .expect("task")
}

fn line_task() -> Task {
    let x: Vec<f32> = (0..30).map(|i| i as f32).collect();
    let y: Vec<f32> = x.iter().map(|v| 2.0 * v + 1.0).collect();
    Task::regression("line", frame(&[("x", x), ("y", y)]), "y").expect("task")
}

#[test]
fn test_ids_are_stable() {
    let ids: Vec<&str> = Learner::ALL.iter().map(Learner::id).collect();
    assert_eq!(ids, vec!["knn", "random_forest", "gbm", "lda", "qda"]);
    assert_eq!(Learner::GradientBoosting.to_string(), "gbm");
}

#[test]
fn test_discriminants_reject_regression() {
    let task = line_task();
    for learner in [Learner::Lda, Learner::Qda] {
        let err = learner
            .train(&task, &Assignment::new(), 0)
            .expect_err("classification only");
        assert!(matches!(err, TuneError::InvalidConfig(_)));
    }
}

#[test]
fn test_undeclared_param_rejected() {
    let task = two_class_task();
    let assignment = Assignment::new().with(Param::Shrinkage, 0.1);
    let err = Learner::Knn
        .train(&task, &assignment, 0)
        .expect_err("knn has no shrinkage");
    match err {
        TuneError::InvalidHyperparameter { param, .. } => assert_eq!(param, "shrinkage"),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_int_param_validation() {
    let assignment = Assignment::new().with(Param::K, 0_i64);
    let err = int_param(&assignment, Param::K, 7, 1).expect_err("k = 0");
    assert!(err.to_string().contains(">= 1"));

    let fractional = Assignment::new().with(Param::K, 2.5);
    assert!(int_param(&fractional, Param::K, 7, 1).is_err());

    let whole = Assignment::new().with(Param::K, 3.0);
    assert_eq!(int_param(&whole, Param::K, 7, 1).expect("3.0 is integral"), 3);
    assert_eq!(int_param(&Assignment::new(), Param::K, 7, 1).expect("default"), 7);
}

#[test]
fn test_float_param_validation() {
    let assignment = Assignment::new().with(Param::Shrinkage, -0.5);
    assert!(float_param(&assignment, Param::Shrinkage, 0.1, |v| v > 0.0, "positive").is_err());
    let nan = Assignment::new().with(Param::Shrinkage, f64::NAN);
    assert!(float_param(&nan, Param::Shrinkage, 0.1, |_| true, "finite").is_err());
}

#[test]
fn test_every_learner_predicts_labels_from_domain() {
    let task = two_class_task();
    for learner in Learner::ALL {
        let assignment = match learner {
            Learner::GradientBoosting => Assignment::new()
                .with(Param::NTrees, 20_i64)
                .with(Param::MinObsInNode, 2_i64),
            Learner::RandomForest => Assignment::new().with(Param::NTree, 25_i64),
            _ => Assignment::new(),
        };
        let model = learner.train(&task, &assignment, 11).expect("fit");
        let pred = model.predict(task.data()).expect("predict");
        assert_eq!(pred.len(), 20);
        assert_eq!(pred.as_slice(), task.target_values().as_slice(), "{learner}");
    }
}

#[test]
fn test_regression_learners_track_line() {
    let task = line_task();
    for learner in [Learner::Knn, Learner::RandomForest, Learner::GradientBoosting] {
        let model = learner.train(&task, &Assignment::new(), 3).expect("fit");
        let pred = model.predict(task.data()).expect("predict");
        let mae = crate::metrics::mae(pred.as_slice(), task.target_values().as_slice());
        assert!(mae < 6.0, "{learner} mae {mae}");
    }
}

#[test]
fn test_predict_selects_columns_by_name() {
    let task = two_class_task();
    let model = Learner::Knn
        .train(&task, &Assignment::new().with(Param::K, 3_i64), 0)
        .expect("fit");

    // reordered columns, extra column, no target
    let df = frame(&[
        ("extra", vec![9.0, 9.0]),
        ("x2", vec![1.0, 2.0]),
        ("x1", vec![0.2, 6.8]),
    ]);
    let pred = model.predict(&df).expect("predict");
    assert_eq!(pred.as_slice(), &[3.0, 7.0]);
}

#[test]
fn test_predict_reports_missing_features() {
    let task = two_class_task();
    let model = Learner::Lda.train(&task, &Assignment::new(), 0).expect("fit");
    let df = frame(&[("x1", vec![0.0])]);
    match model.predict(&df).expect_err("x2 missing") {
        TuneError::SchemaMismatch { missing } => assert_eq!(missing, vec!["x2".to_string()]),
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_oob_error_only_for_forest() {
    let task = two_class_task();
    let forest = Learner::RandomForest
        .train(&task, &Assignment::new().with(Param::NTree, 30_i64), 1)
        .expect("forest");
    assert!(forest.oob_error().is_some());
    let knn = Learner::Knn.train(&task, &Assignment::new(), 1).expect("knn");
    assert!(knn.oob_error().is_none());
}

#[test]
fn test_single_class_training_rows_fail() {
    let task = two_class_task();
    let labels = vec![0usize; 5];
    let x = task.features().select_rows(&[0, 1, 2, 3, 4]);
    let err = Learner::Knn
        .fit_backend(
            TaskKind::Classification,
            &x,
            Target::Classes {
                labels: &labels,
                n_classes: 2,
            },
            &Assignment::new(),
            0,
        )
        .expect_err("one class");
    assert!(matches!(err, TuneError::Fit(_)));
}
