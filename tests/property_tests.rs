//! Property-based tests using proptest.
//!
//! These tests verify invariants of search spaces and resampling.

use aprender_tune::model_selection::{KFold, StratifiedKFold};
use aprender_tune::prelude::*;
use proptest::prelude::*;

fn task_with_rows(n: usize, n_classes: usize) -> Task {
    let x: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let y: Vec<f32> = (0..n).map(|i| (i % n_classes) as f32).collect();
    let df = DataFrame::new(vec![
        ("x".to_string(), Vector::from_vec(x)),
        ("y".to_string(), Vector::from_vec(y)),
    ])
    .expect("Test data should be valid");
    Task::classification("prop", df, "y").expect("Test task should be valid")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn grid_size_is_cartesian_product(
        k_high in 1i64..15,
        n_choices in 1usize..5,
        resolution in 1usize..6,
    ) {
        let space = SearchSpace::new(vec![
            HyperparameterSpec::new(Param::K, Domain::integer(1, k_high)),
            HyperparameterSpec::new(Param::DistanceWeighted, Domain::boolean()),
            HyperparameterSpec::new(Param::DistancePower, Domain::continuous(1.0, 3.0)),
            HyperparameterSpec::new(
                Param::Mtry,
                Domain::discrete((0..n_choices as i64).map(|v| v + 1)),
            ),
        ])
        .expect("valid space");

        let expected = k_high as usize * 2 * resolution * n_choices;
        let candidates = SearchStrategy::grid_with_resolution(resolution)
            .candidates(&space, 0)
            .expect("candidates");
        prop_assert_eq!(candidates.len(), expected);
        prop_assert_eq!(space.grid_size(resolution), expected);
    }

    #[test]
    fn random_search_yields_n_iter_in_domain(n_iter in 1usize..40, seed in any::<u64>()) {
        let space = SearchSpace::new(vec![
            HyperparameterSpec::new(Param::NTrees, Domain::integer(5, 50)),
            HyperparameterSpec::new(Param::Shrinkage, Domain::continuous_log(0.001, 0.5)),
        ])
        .expect("valid space");

        let candidates = SearchStrategy::random(n_iter)
            .candidates(&space, seed)
            .expect("candidates");
        prop_assert_eq!(candidates.len(), n_iter);
        for c in &candidates {
            let trees = c.get_i64(Param::NTrees).expect("set");
            let rate = c.get_f64(Param::Shrinkage).expect("set");
            prop_assert!((5..=50).contains(&trees));
            prop_assert!((0.001..=0.5).contains(&rate));
        }
    }

    #[test]
    fn kfold_partitions_rows(n in 2usize..120, k in 2usize..10, seed in any::<u64>()) {
        prop_assume!(k <= n);
        let splits = KFold::new(k).with_shuffle(true).with_random_state(seed).split(n);
        prop_assert_eq!(splits.len(), k);

        let mut seen = vec![0usize; n];
        let sizes: Vec<usize> = splits.iter().map(|(_, test)| test.len()).collect();
        for (train, test) in &splits {
            prop_assert_eq!(train.len() + test.len(), n);
            for &i in test {
                seen[i] += 1;
            }
        }
        prop_assert!(seen.iter().all(|&c| c == 1));
        let max = sizes.iter().max().copied().unwrap_or(0);
        let min = sizes.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }

    #[test]
    fn stratified_folds_keep_class_shares(
        n in 30usize..150,
        n_classes in 2usize..5,
        k in 2usize..8,
        seed in any::<u64>(),
    ) {
        let labels: Vec<usize> = (0..n).map(|i| (i * 7 + i / 3) % n_classes).collect();
        let splits = StratifiedKFold::new(k)
            .with_shuffle(true)
            .with_random_state(seed)
            .split(&labels);

        for class in 0..n_classes {
            let total = labels.iter().filter(|&&l| l == class).count();
            for (_, test) in &splits {
                let in_fold = test.iter().filter(|&&i| labels[i] == class).count();
                let share = total as f64 / k as f64;
                prop_assert!((in_fold as f64 - share).abs() <= 1.0);
            }
        }
    }

    #[test]
    fn repeated_cv_instances_are_reproducible(reps in 1usize..6, seed in any::<u64>()) {
        let task = task_with_rows(40, 3);
        let resampling = Resampling::repeated_cv(4, reps).stratified();
        let a = resampling.instantiate(&task, seed).expect("instance");
        let b = resampling.instantiate(&task, seed).expect("instance");
        prop_assert_eq!(a.len(), 4 * reps);
        prop_assert_eq!(a.n_repetitions(), reps);
        prop_assert_eq!(a, b);
    }
}
