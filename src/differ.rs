//! The differentiator facade: seed bindings plus `derive` entry points.
//!
//! ```
//! use dualgrad::Differ;
//!
//! let mut ad = Differ::new();
//! ad.bind("x", 2f64);
//! let res = ad.derive("(x^x)").unwrap();
//! assert!(res.is_success());
//! assert_eq!(res.value.value(), 4.);
//! assert!((res.value.partials()[0] - 6.772588).abs() < 1e-6);
//! ```

use log::debug;
use num_traits::One;

use crate::{
    driver::{Executor, Outcome, Sequential, Unit},
    parser::{seed_width, Derivation, Reducer},
    Dual, Scalar,
};

/// An independent variable and the dual number it starts out as.
#[derive(Clone, Debug, PartialEq)]
pub struct Seed<T> {
    pub name: String,
    pub value: Dual<T>,
}

impl<T: Scalar> Seed<T> {
    pub fn new(name: impl Into<String>, value: Dual<T>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn scalar(name: impl Into<String>, value: T, derivative: T) -> Self {
        Self::new(name, Dual::scalar(value, derivative))
    }

    pub fn vector(name: impl Into<String>, value: T, derivatives: Vec<T>) -> Self {
        Self::new(name, Dual::new(value, derivatives))
    }

    /// The `index`-th of `width` variables in Jacobian mode.
    pub fn independent(name: impl Into<String>, value: T, index: usize, width: usize) -> Self {
        Self::new(name, Dual::variable(value, index, width))
    }
}

/// Evaluates one expression against one seed list with a private reducer.
///
/// Every `derive` entry point and every batch strategy ends up here.
pub fn derive<T: Scalar>(expression: &str, seeds: &[Seed<T>]) -> Outcome<T> {
    let res = match Reducer::new(expression, seeds) {
        Ok(reducer) => reducer.run()?,
        Err(err) => Derivation::failure(&err, seed_width(seeds)),
    };
    debug!("derive {expression}: {}", res.status);
    Ok(res)
}

/// Holds seed bindings and evaluates expressions against them.
///
/// Partial `i` of every result is the derivative with respect to the
/// `i`-th slot of the seed vectors, so in Jacobian mode all bindings must
/// use vectors of the same width, ordered the same way.
///
/// Batch calls are handed to the executor `E`; all executors give the same
/// results in the same order.
#[derive(Clone, Debug, Default)]
pub struct Differ<T = f64, E = Sequential> {
    seeds: Vec<Seed<T>>,
    executor: E,
}

impl<T: Scalar> Differ<T> {
    pub fn new() -> Self {
        Self::with_executor(Sequential)
    }
}

impl<T: Scalar, E: Executor> Differ<T, E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            seeds: vec![],
            executor,
        }
    }

    /// Binds a single-variable seed with derivative one.
    pub fn bind(&mut self, name: impl Into<String>, value: T) {
        self.bind_with(name, value, T::one());
    }

    pub fn bind_with(&mut self, name: impl Into<String>, value: T, derivative: T) {
        self.seeds.push(Seed::scalar(name, value, derivative));
    }

    /// Binds a seed with an explicit vector of partials.
    pub fn bind_vector(&mut self, name: impl Into<String>, value: T, derivatives: Vec<T>) {
        self.seeds.push(Seed::vector(name, value, derivatives));
    }

    /// Replaces the bindings with one one-hot seed per variable, in order,
    /// so that results carry a full Jacobian row.
    pub fn bind_independent(&mut self, vars: &[(&str, T)]) {
        let width = vars.len();
        self.seeds = vars
            .iter()
            .enumerate()
            .map(|(i, &(name, value))| Seed::independent(name, value, i, width))
            .collect();
    }

    pub fn seeds(&self) -> &[Seed<T>] {
        &self.seeds
    }

    /// Number of partials in results.
    pub fn width(&self) -> usize {
        seed_width(&self.seeds)
    }

    pub fn clear(&mut self) {
        self.seeds.clear();
    }

    pub fn derive(&self, expression: &str) -> Outcome<T> {
        derive(expression, &self.seeds)
    }

    /// Evaluates every expression against the current bindings.
    /// Slot `i` of the result belongs to `expressions[i]`.
    pub fn derive_all<S: AsRef<str>>(&self, expressions: &[S]) -> Vec<Outcome<T>> {
        let units = expressions
            .iter()
            .map(|expression| Unit::new(expression.as_ref(), self.seeds.clone()))
            .collect();
        self.executor.execute(units)
    }

    /// Evaluates one expression once per seed set, ignoring the current
    /// bindings. Slot `i` of the result belongs to `seed_sets[i]`.
    pub fn derive_seeds(&self, expression: &str, seed_sets: &[Vec<Seed<T>>]) -> Vec<Outcome<T>> {
        let units = seed_sets
            .iter()
            .map(|seeds| Unit::new(expression, seeds.clone()))
            .collect();
        self.executor.execute(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReturnCode;

    #[test]
    fn test_bind() {
        let mut ad = Differ::new();
        ad.bind("x", 2.);
        ad.bind_with("y", 3., 0.);
        assert_eq!(ad.width(), 1);
        assert_eq!(ad.seeds()[1], Seed::scalar("y", 3., 0.));

        let res = ad.derive("(x*y)").unwrap();
        assert_eq!(res.value, Dual::new(6., vec![3.]));

        ad.clear();
        assert!(ad.seeds().is_empty());
        let res = ad.derive("(x*y)").unwrap();
        assert_eq!(res.status.code, ReturnCode::ParseError);
        assert_eq!(res.status.message, "Key not found: y");
    }

    #[test]
    fn test_bind_independent() {
        let mut ad = Differ::new();
        ad.bind("z", 1.);
        ad.bind_independent(&[("x", -1.), ("y", 2.)]);
        assert_eq!(ad.width(), 2);
        assert_eq!(ad.seeds()[0], Seed::vector("x", -1., vec![1., 0.]));
        assert_eq!(ad.seeds()[1], Seed::vector("y", 2., vec![0., 1.]));

        let res = ad.derive("(x+y)").unwrap().into_result().unwrap();
        assert_eq!(res, Dual::new(1., vec![1., 1.]));
    }

    #[test]
    fn test_failure_width() {
        let mut ad = Differ::new();
        ad.bind_vector("x", 3., vec![1., 0.]);
        ad.bind_vector("y", -1., vec![0., 1.]);
        let res = ad.derive("x+5").unwrap();
        assert_eq!(res.status.message, "No parentheses found.");
        assert_eq!(res.value, Dual::zero(2));
        assert!(res.into_result().is_err());
    }
}
