use super::*;

fn blobs(n_per_class: usize) -> (Matrix<f32>, Vec<usize>) {
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for class in 0..2 {
        let offset = class as f32 * 10.0;
        for i in 0..n_per_class {
            let jitter = (i % 5) as f32 * 0.3;
            data.extend_from_slice(&[offset + jitter, offset - jitter, offset + 0.5 * jitter]);
            labels.push(class);
        }
    }
    let x = Matrix::from_vec(2 * n_per_class, 3, data).expect("matrix");
    (x, labels)
}

#[test]
fn test_defaults_follow_task_kind() {
    let clf = ForestParams::defaults(TaskKind::Classification, 13);
    assert_eq!(clf.mtry, 3);
    assert_eq!(clf.node_size, 1);
    assert_eq!(clf.n_trees, 100);

    let reg = ForestParams::defaults(TaskKind::Regression, 2);
    assert_eq!(reg.mtry, 1);
    assert_eq!(reg.node_size, 5);
}

#[test]
fn test_resolve_rejects_oversized_mtry() {
    let assignment = Assignment::new().with(Param::Mtry, 9_i64);
    let err = ForestParams::resolve(&assignment, TaskKind::Classification, 4).expect_err("mtry");
    assert!(err.to_string().contains("mtry"));
}

#[test]
fn test_forest_classifies_and_reports_oob() {
    let (x, y) = blobs(20);
    let params = ForestParams {
        n_trees: 25,
        ..ForestParams::defaults(TaskKind::Classification, 3)
    };
    let target = Target::Classes {
        labels: &y,
        n_classes: 2,
    };
    let forest = RandomForest::fit(&x, target, &params, 11).expect("fit");
    assert_eq!(forest.n_trees(), 25);

    let oob = forest.oob_error().expect("some rows are out of bag");
    assert!(oob < 0.1, "oob error {oob}");

    match forest.predict(&x).expect("predict") {
        Output::Classes(pred) => assert_eq!(pred, y),
        Output::Values(_) => panic!("expected classes"),
    }
}

#[test]
fn test_forest_is_deterministic_per_seed() {
    let x = Matrix::from_vec(8, 1, (0..8).map(|i| i as f32).collect()).expect("matrix");
    let y: Vec<f32> = (0..8).map(|i| (i * i) as f32).collect();
    let params = ForestParams {
        n_trees: 10,
        mtry: 1,
        node_size: 1,
        max_depth: None,
    };
    let a = RandomForest::fit(&x, Target::Values(&y), &params, 3).expect("a");
    let b = RandomForest::fit(&x, Target::Values(&y), &params, 3).expect("b");
    assert_eq!(a.predict(&x).expect("a"), b.predict(&x).expect("b"));
    assert_eq!(a.oob_error(), b.oob_error());
}

#[test]
fn test_predict_rejects_wrong_width() {
    let (x, y) = blobs(5);
    let params = ForestParams {
        n_trees: 3,
        ..ForestParams::defaults(TaskKind::Classification, 3)
    };
    let forest = RandomForest::fit(
        &x,
        Target::Classes {
            labels: &y,
            n_classes: 2,
        },
        &params,
        0,
    )
    .expect("fit");
    let narrow = Matrix::from_vec(1, 2, vec![0.0, 0.0]).expect("matrix");
    assert!(forest.predict(&narrow).is_err());
}
