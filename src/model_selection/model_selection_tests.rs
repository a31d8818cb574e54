use super::*;
use crate::data::DataFrame;
use crate::primitives::Vector;

fn class_task(counts: &[usize]) -> Task {
    let labels: Vec<f32> = counts
        .iter()
        .enumerate()
        .flat_map(|(class, &n)| std::iter::repeat(class as f32).take(n))
        .collect();
    let n = labels.len();
    let df = DataFrame::new(vec![
        (
            "x".to_string(),
            Vector::from_vec((0..n).map(|i| i as f32).collect()),
        ),
        ("class".to_string(), Vector::from_vec(labels)),
    ])
    .expect("frame");
    Task::classification("classes", df, "class").expect("task")
}

fn regression_task(n: usize) -> Task {
    let df = DataFrame::new(vec![
        (
            "x".to_string(),
            Vector::from_vec((0..n).map(|i| i as f32).collect()),
        ),
        (
            "y".to_string(),
            Vector::from_vec((0..n).map(|i| 2.0 * i as f32).collect()),
        ),
    ])
    .expect("frame");
    Task::regression("line", df, "y").expect("task")
}

fn assert_partition(split_test_sets: &[&[usize]], n: usize) {
    let mut seen = vec![0usize; n];
    for test in split_test_sets {
        for &i in *test {
            seen[i] += 1;
        }
    }
    assert!(seen.iter().all(|&c| c == 1), "every row in exactly one fold");
}

#[test]
fn test_kfold_uneven_split() {
    let splits = KFold::new(3).split(10);
    let sizes: Vec<usize> = splits.iter().map(|(_, t)| t.len()).collect();
    assert_eq!(sizes, vec![4, 3, 3]);
    for (train, test) in &splits {
        assert_eq!(train.len() + test.len(), 10);
    }
}

#[test]
fn test_kfold_no_shuffle_is_contiguous() {
    let splits = KFold::new(2).split(4);
    assert_eq!(splits[0].1, vec![0, 1]);
    assert_eq!(splits[1].1, vec![2, 3]);
    assert_eq!(splits[1].0, vec![0, 1]);
}

#[test]
fn test_kfold_shuffle_reproducible() {
    let a = KFold::new(5).with_random_state(42).split(20);
    let b = KFold::new(5).with_random_state(42).split(20);
    let c = KFold::new(5).with_random_state(43).split(20);
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_stratified_kfold_imbalanced_classes() {
    let labels: Vec<usize> = [vec![0; 9], vec![1; 3]].concat();
    let splits = StratifiedKFold::new(3).with_random_state(1).split(&labels);
    let tests: Vec<&[usize]> = splits.iter().map(|(_, t)| t.as_slice()).collect();
    assert_partition(&tests, labels.len());
    for test in tests {
        assert_eq!(test.iter().filter(|&&i| labels[i] == 0).count(), 3);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 1);
    }
}

#[test]
fn test_cv_instance_partitions_rows() {
    let task = regression_task(23);
    let inst = Resampling::cv(4).instantiate(&task, 9).expect("instance");
    assert_eq!(inst.len(), 4);
    assert_eq!(inst.n_repetitions(), 1);
    let tests: Vec<&[usize]> = inst.splits().iter().map(|s| s.test.as_slice()).collect();
    assert_partition(&tests, 23);
    let sizes: Vec<usize> = tests.iter().map(|t| t.len()).collect();
    assert!(sizes.iter().max().expect("max") - sizes.iter().min().expect("min") <= 1);
}

#[test]
fn test_instance_is_deterministic_per_seed() {
    let task = class_task(&[10, 12]);
    let r = Resampling::repeated_cv(3, 4).stratified();
    assert_eq!(
        r.instantiate(&task, 5).expect("a"),
        r.instantiate(&task, 5).expect("b")
    );
    assert_ne!(
        r.instantiate(&task, 5).expect("a"),
        r.instantiate(&task, 6).expect("c")
    );
}

#[test]
fn test_stratified_repeated_cv_wine_shape() {
    // 178 rows, 3 classes (59/71/48), 10 folds x 50 repetitions
    let counts = [59usize, 71, 48];
    let task = class_task(&counts);
    let inst = Resampling::repeated_cv(10, 50)
        .stratified()
        .instantiate(&task, 2024)
        .expect("instance");

    assert_eq!(inst.len(), 500);
    assert_eq!(inst.n_repetitions(), 50);

    let labels = task.encoded_labels();
    let mut partitions = Vec::new();
    for rep in 0..50 {
        let splits: Vec<&Split> = inst.repetition(rep).collect();
        assert_eq!(splits.len(), 10);
        let tests: Vec<&[usize]> = splits.iter().map(|s| s.test.as_slice()).collect();
        assert_partition(&tests, 178);

        for test in &tests {
            for (class, &n_c) in counts.iter().enumerate() {
                let share = n_c as f64 / 10.0;
                let count = test.iter().filter(|&&i| labels[i] == class).count() as f64;
                assert!((count - share).abs() <= 1.0, "class {class}: {count} vs {share}");
            }
        }
        partitions.push(splits[0].test.clone());
    }

    partitions.sort();
    partitions.dedup();
    assert!(partitions.len() > 1, "repetitions draw independent partitions");
}

#[test]
fn test_holdout_ratio() {
    let task = regression_task(10);
    let inst = Resampling::holdout(0.7).instantiate(&task, 3).expect("holdout");
    assert_eq!(inst.len(), 1);
    assert_eq!(inst.splits()[0].train.len(), 7);
    assert_eq!(inst.splits()[0].test.len(), 3);
}

#[test]
fn test_stratified_holdout_keeps_both_classes() {
    let task = class_task(&[20, 10]);
    let inst = Resampling::holdout(0.5)
        .stratified()
        .instantiate(&task, 3)
        .expect("holdout");
    let labels = task.encoded_labels();
    let split = &inst.splits()[0];
    assert_eq!(split.test.iter().filter(|&&i| labels[i] == 1).count(), 5);
    assert_eq!(split.train.len() + split.test.len(), 30);
}

#[test]
fn test_invalid_configurations() {
    let task = regression_task(5);
    for bad in [
        Resampling::cv(1),
        Resampling::cv(6),
        Resampling::repeated_cv(2, 0),
        Resampling::holdout(0.0),
        Resampling::holdout(1.0),
        Resampling::holdout(0.01),
        Resampling::cv(2).stratified(),
    ] {
        let err = bad.instantiate(&task, 0).expect_err("invalid config");
        assert!(matches!(err, TuneError::InvalidConfig(_)), "{bad}");
    }
}

#[test]
fn test_stratified_holdout_rejects_empty_side_from_class_rounding() {
    let task = class_task(&[2, 2]);
    assert!(Resampling::holdout(0.75).validate(&task).is_ok());

    // 2 * 0.75 rounds to 2 in each class, so nothing is left to test
    for bad in [
        Resampling::holdout(0.75).stratified(),
        Resampling::holdout(0.2).stratified(),
    ] {
        let err = bad.validate(&task).expect_err("empty side");
        assert!(matches!(err, TuneError::InvalidConfig(_)), "{bad}");
        assert!(bad.instantiate(&task, 0).is_err());
    }

    let inst = Resampling::holdout(0.6)
        .stratified()
        .instantiate(&task, 0)
        .expect("holdout");
    let split = &inst.splits()[0];
    assert!(!split.train.is_empty() && !split.test.is_empty());
}

#[test]
fn test_n_splits_and_display() {
    assert_eq!(Resampling::holdout(0.8).n_splits(), 1);
    assert_eq!(Resampling::repeated_cv(10, 50).n_splits(), 500);
    assert_eq!(Resampling::cv(3).stratified().to_string(), "3-fold CV stratified");
}

#[test]
fn test_cross_validation_result_stats() {
    let r = CrossValidationResult {
        scores: vec![0.1, 0.2, 0.3],
    };
    assert!((r.mean() - 0.2).abs() < 1e-12);
    assert!((r.min() - 0.1).abs() < 1e-12);
    assert!((r.max() - 0.3).abs() < 1e-12);
    assert!(r.std() > 0.0);
    assert!(CrossValidationResult { scores: vec![] }.mean().is_nan());
}
