use super::*;

/// Two Gaussian-ish classes: class 0 tight around the origin, class 1 wide
/// around (4, 4).
fn heteroscedastic() -> (Matrix<f32>, Vec<usize>) {
    let offsets = [
        (-1.0, -0.5),
        (0.5, 1.0),
        (1.0, -1.0),
        (-0.5, 0.5),
        (0.0, 0.0),
        (0.8, 0.3),
    ];
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for &(dx, dy) in &offsets {
        data.extend_from_slice(&[0.3 * dx, 0.3 * dy]);
        labels.push(0);
    }
    for &(dx, dy) in &offsets {
        data.extend_from_slice(&[4.0 + 1.5 * dx, 4.0 + 1.5 * dy]);
        labels.push(1);
    }
    (Matrix::from_vec(12, 2, data).expect("matrix"), labels)
}

fn target(labels: &[usize]) -> Target<'_> {
    Target::Classes {
        labels,
        n_classes: 2,
    }
}

#[test]
fn test_cholesky_reconstructs_matrix() {
    let mut a = vec![4.0, 2.0, 2.0, 3.0];
    cholesky(&mut a, 2).expect("positive definite");
    assert!((a[0] - 2.0).abs() < 1e-12);
    assert!((a[2] - 1.0).abs() < 1e-12);
    assert!((a[3] - 2.0_f64.sqrt()).abs() < 1e-12);
    assert!((log_det(&a, 2) - 8.0_f64.ln()).abs() < 1e-12);
}

#[test]
fn test_cholesky_rejects_singular() {
    let mut a = vec![1.0, 1.0, 1.0, 1.0];
    assert!(cholesky(&mut a, 2).is_none());
}

#[test]
fn test_mahalanobis_identity() {
    let mut l = vec![1.0, 0.0, 0.0, 1.0];
    cholesky(&mut l, 2).expect("identity");
    let mut v = vec![3.0, 4.0];
    assert!((mahalanobis_sq(&l, 2, &mut v) - 25.0).abs() < 1e-12);
}

#[test]
fn test_lda_and_qda_fit_training_data() {
    let (x, y) = heteroscedastic();
    let lda = Lda::fit(&x, target(&y), &(), 0).expect("lda");
    let qda = Qda::fit(&x, target(&y), &QdaParams::default(), 0).expect("qda");
    assert_eq!(lda.predict(&x).expect("lda"), Output::Classes(y.clone()));
    assert_eq!(qda.predict(&x).expect("qda"), Output::Classes(y));
}

#[test]
fn test_qda_uses_class_spread() {
    let (x, y) = heteroscedastic();
    let qda = Qda::fit(&x, target(&y), &QdaParams::default(), 0).expect("qda");
    // Equidistant in Euclidean terms, but the wide class explains it better
    let probe = Matrix::from_vec(1, 2, vec![2.0, 2.0]).expect("matrix");
    assert_eq!(qda.predict(&probe).expect("predict"), Output::Classes(vec![1]));
}

#[test]
fn test_single_class_rejected() {
    let (x, _) = heteroscedastic();
    let labels = vec![0; 12];
    assert!(Lda::fit(&x, target(&labels), &(), 0).is_err());
    assert!(Qda::fit(&x, target(&labels), &QdaParams::default(), 0).is_err());
}

#[test]
fn test_qda_singular_class_needs_regularisation() {
    // class 1 lies on a line: singular covariance
    let x = Matrix::from_vec(
        6,
        2,
        vec![0.0, 0.0, 1.0, 0.5, 0.3, 1.0, 5.0, 5.0, 6.0, 6.0, 7.0, 7.0],
    )
    .expect("matrix");
    let y = [0, 0, 0, 1, 1, 1];
    let err = Qda::fit(&x, target(&y), &QdaParams::default(), 0).expect_err("singular");
    assert!(err.to_string().contains("singular"));

    let shrunk = Qda::fit(&x, target(&y), &QdaParams { reg_param: 0.5 }, 0).expect("shrunk");
    assert_eq!(shrunk.predict(&x).expect("predict"), Output::Classes(y.to_vec()));
}

#[test]
fn test_regression_target_rejected() {
    let (x, _) = heteroscedastic();
    let values = vec![0.0; 12];
    assert!(Lda::fit(&x, Target::Values(&values), &(), 0).is_err());
}

#[test]
fn test_reg_param_bounds() {
    let bad = Assignment::new().with(Param::RegParam, 1.5);
    assert!(QdaParams::resolve(&bad).is_err());
    let ok = Assignment::new().with(Param::RegParam, 0.25);
    assert!((QdaParams::resolve(&ok).expect("valid").reg_param - 0.25).abs() < 1e-12);
}
