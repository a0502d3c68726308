#![cfg(feature = "rayon")]

use dualgrad::{
    DiffError, Differ, DriverConfig, Executor, Outcome, ParallelFor, Seed, Sequential, Unit,
    WorkerPool,
};
use proptest::prelude::*;

const LONG: &str = "((((((-2)/(x^x))*((tan(exp(sin(cos(x)))))+x))/x)+((((-2)/(x^x))*((tan(exp(sin(cos(x)))))+x))/x))+((((-2)/(x^x))*((tan(exp(sin(cos(x)))))+x))/x))";

fn parallel_for() -> ParallelFor {
    ParallelFor::new(&DriverConfig::default().with_workers(4)).unwrap()
}

fn derive_all_with<E: Executor>(executor: E, x: f64, expressions: &[&str]) -> Vec<Outcome<f64>> {
    let mut ad = Differ::with_executor(executor);
    ad.bind("x", x);
    ad.derive_all(expressions)
}

#[test]
fn test_derive_all_long() {
    let expressions = vec![LONG; 100];
    let expected = derive_all_with(Sequential, 0.444, &expressions);
    assert_eq!(expected.len(), 100);
    let first = expected[0].as_ref().unwrap();
    assert!(first.is_success());
    assert!(expected.iter().all(|res| res.as_ref().unwrap() == first));

    assert_eq!(derive_all_with(WorkerPool, 0.444, &expressions), expected);
    assert_eq!(derive_all_with(parallel_for(), 0.444, &expressions), expected);
}

#[test]
fn test_derive_all_keeps_order() {
    let expressions = ["(sin(-1))", "(2*(x+5))", "(y^2)", "x+5", "(x^2)"];
    for results in [
        derive_all_with(Sequential, 0.444, &expressions),
        derive_all_with(WorkerPool, 0.444, &expressions),
        derive_all_with(parallel_for(), 0.444, &expressions),
    ] {
        let results: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert!((results[0].value.value() + 0.8414).abs() < 1e-3);
        assert!((results[1].value.value() - 10.888).abs() < 1e-3);
        assert_eq!(results[2].status.message, "Key not found: y");
        assert_eq!(results[3].status.message, "No parentheses found.");
        assert!((results[4].value.partials()[0] - 0.888).abs() < 1e-9);
    }
}

#[test]
fn test_fatal_unit_does_not_poison_batch() {
    let expressions = ["(x^x)", "(x^2)"];
    for results in [
        derive_all_with(Sequential, -2., &expressions),
        derive_all_with(WorkerPool, -2., &expressions),
        derive_all_with(parallel_for(), -2., &expressions),
    ] {
        assert!(matches!(
            results[0],
            Err(DiffError::UndefinedDerivative { .. })
        ));
        assert_eq!(results[1].as_ref().unwrap().value.value(), 4.);
    }
}

#[test]
fn test_integer_overflow_keeps_siblings() {
    let expressions = ["(x+1)", "(9999999999*9999999999)", "((x*x)/x)"];
    let run = |results: Vec<Outcome<i64>>| {
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().value.value(), 4_000_000_001);
        assert!(results.iter().all(|res| res.as_ref().unwrap().is_success()));
        results
    };

    let mut ad = Differ::<i64, _>::with_executor(WorkerPool);
    ad.bind("x", 4_000_000_000);
    let pool = run(ad.derive_all(&expressions));

    let mut ad = Differ::<i64, _>::with_executor(parallel_for());
    ad.bind("x", 4_000_000_000);
    assert_eq!(run(ad.derive_all(&expressions)), pool);
}

#[test]
fn test_derive_seeds() {
    let seed_sets: Vec<Vec<Seed<f64>>> = (0..10)
        .map(|i| {
            vec![
                Seed::vector("x", 0.444 + i as f64 * 0.1, vec![1., 1.]),
                Seed::vector("y", 0.444, vec![1., 1.]),
            ]
        })
        .collect();

    let sequential = Differ::new().derive_seeds(LONG, &seed_sets);
    let pool = Differ::with_executor(WorkerPool).derive_seeds(LONG, &seed_sets);
    let parallel = Differ::with_executor(parallel_for()).derive_seeds(LONG, &seed_sets);
    assert_eq!(sequential.len(), 10);
    assert_eq!(pool, sequential);
    assert_eq!(parallel, sequential);

    // Each slot belongs to its own seed set.
    for (seeds, res) in seed_sets.iter().zip(&sequential) {
        let single = dualgrad::derive(LONG, seeds).unwrap();
        assert_eq!(res.as_ref().unwrap(), &single);
        assert_eq!(single.value.width(), 2);
    }
}

#[test]
fn test_execute_units_directly() {
    let units = vec![
        Unit::new("(x*3)", vec![Seed::scalar("x", 1., 1.)]),
        Unit::new("(x*3)", vec![Seed::scalar("x", 2., 1.)]),
    ];
    let exec = parallel_for();
    assert_eq!(exec.name(), "parallel for");
    let res = exec.execute(units);
    assert_eq!(res[0].as_ref().unwrap().value.value(), 3.);
    assert_eq!(res[1].as_ref().unwrap().value.value(), 6.);
}

proptest! {
    #[test]
    fn constant_expressions_have_zero_derivative(
        a in 0i64..100,
        b in -100i64..100,
        op in prop::sample::select(vec!['+', '-', '*', '/', '^']),
        x in -10f64..10.,
    ) {
        prop_assume!(op != '/' || b != 0);
        let mut ad = Differ::new();
        ad.bind("x", x);
        let res = ad.derive(&format!("({a}{op}{b})")).unwrap();
        prop_assert!(res.is_success());
        let (a, b) = (a as f64, b as f64);
        let expected = match op {
            '+' => a + b,
            '-' => a - b,
            '*' => a * b,
            '/' => a / b,
            // A zero base is zero whatever the exponent.
            _ if a == 0. => 0.,
            _ => a.powf(b),
        };
        prop_assert_eq!(res.value.value(), expected);
        prop_assert_eq!(res.value.partials(), &[0.][..]);
    }

    #[test]
    fn strategies_agree(x in 0.1f64..3.) {
        let expressions = [
            "((x^x)*(sin(x)))",
            "(log_2_(x))",
            "((exp(x))/(x+1))",
            "((sqrt(x))-(arctan(x)))",
        ];
        let expected = derive_all_with(Sequential, x, &expressions);
        prop_assert_eq!(derive_all_with(WorkerPool, x, &expressions), expected.clone());
        prop_assert_eq!(derive_all_with(parallel_for(), x, &expressions), expected);
    }
}
