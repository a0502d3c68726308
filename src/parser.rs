//! The expression reducer.
//!
//! Expressions are fully parenthesised: every operator application is
//! written as `(LHS op RHS)` or `(func(ARG))`, and there is no precedence.
//! The reducer collapses the innermost pair first, turning each into a
//! temporary (`x0`, `x1`, …) that its enclosing pair refers to, until the
//! outermost pair has been evaluated.

use std::collections::HashMap;

use log::trace;
use num_traits::Zero;

use crate::{
    error::{DiffError, ParseError, Status},
    node::{OpNode, Operation},
    tape::{Piece, Tape},
    unary_fn::Elementary,
    Dual, Scalar, Seed, UnaryFn,
};

/// Named functions, longest names first so that `sin` never shadows `sinh`
/// and `log` never shadows `logistic`.
const FUNCTIONS: [&str; 13] = [
    "logistic", "sinh", "cosh", "tanh", "sqrt", "arcsin", "arccos", "arctan", "sin", "cos",
    "tan", "exp", "log",
];

/// Interiors up to this length are never taken for a function application.
const BARE_OPERAND_LEN: usize = 3;

/// The result of reducing one expression.
///
/// `value` is only meaningful when `status` is a success; after a parse
/// error it is the zero dual number.
#[derive(Clone, Debug, PartialEq)]
pub struct Derivation<T> {
    pub status: Status,
    pub value: Dual<T>,
}

impl<T: Scalar> Derivation<T> {
    pub fn success(value: Dual<T>) -> Self {
        Self {
            status: Status::success(),
            value,
        }
    }

    pub fn failure(err: &ParseError, width: usize) -> Self {
        Self {
            status: Status::from(err),
            value: Dual::zero(width),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn into_result(self) -> Result<Dual<T>, Status> {
        if self.status.is_success() {
            Ok(self.value)
        } else {
            Err(self.status)
        }
    }
}

/// Identifiers visible to one reduction: the seeded variables and the
/// temporaries produced so far.
#[derive(Clone, Debug)]
pub struct SymbolTable<T> {
    seeds: HashMap<String, Dual<T>>,
    temporaries: Vec<Dual<T>>,
    width: usize,
}

impl<T: Scalar> SymbolTable<T> {
    pub fn new(seeds: &[Seed<T>]) -> Self {
        Self {
            seeds: seeds
                .iter()
                .map(|seed| (seed.name.clone(), seed.value.clone()))
                .collect(),
            temporaries: vec![],
            width: seed_width(seeds),
        }
    }

    /// Number of partials given to literals.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn seed(&self, name: &str) -> Option<&Dual<T>> {
        self.seeds.get(name)
    }

    pub fn temporary(&self, index: usize) -> Option<&Dual<T>> {
        self.temporaries.get(index)
    }

    pub fn push_temporary(&mut self, value: Dual<T>) -> usize {
        self.temporaries.push(value);
        self.temporaries.len() - 1
    }

    pub fn literal(&self, value: T) -> Dual<T> {
        Dual::constant(value, self.width)
    }

    /// Looks a token up as a seeded variable, then tries it as a literal of
    /// the working type. Only decimal spellings count as literals, so `inf`
    /// and `nan` are unknown keys unless seeded.
    pub fn resolve(&self, token: &str) -> Result<Dual<T>, ParseError> {
        if let Some(value) = self.seed(token) {
            return Ok(value.clone());
        }
        let not_found = || ParseError::KeyNotFound(token.to_string());
        if !is_decimal(token) {
            return Err(not_found());
        }
        token
            .parse::<T>()
            .map(|v| self.literal(v))
            .map_err(|_| not_found())
    }
}

fn is_decimal(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
}

/// Partial width implied by a seed list; one when nothing is seeded.
pub(crate) fn seed_width<T: Scalar>(seeds: &[Seed<T>]) -> usize {
    seeds
        .iter()
        .map(|seed| seed.value.width())
        .max()
        .unwrap_or(1)
}

enum Failure {
    Parse(ParseError),
    Fatal(DiffError),
}

impl From<ParseError> for Failure {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<DiffError> for Failure {
    fn from(err: DiffError) -> Self {
        Self::Fatal(err)
    }
}

/// Reduces one expression against one set of seeds. Created for a single
/// run and consumed by it.
#[derive(Debug)]
pub struct Reducer<T> {
    tape: Tape,
    symbols: SymbolTable<T>,
}

impl<T: Scalar> Reducer<T> {
    /// Checks the parentheses of `expression` and loads the seeds.
    pub fn new(expression: &str, seeds: &[Seed<T>]) -> Result<Self, ParseError> {
        Ok(Self {
            tape: Tape::new(expression)?,
            symbols: SymbolTable::new(seeds),
        })
    }

    pub fn symbols(&self) -> &SymbolTable<T> {
        &self.symbols
    }

    /// Runs the reduction to completion.
    ///
    /// Parse errors end up in the returned status. A [`DiffError`] aborts
    /// the run and is returned as is.
    pub fn run(mut self) -> Result<Derivation<T>, DiffError> {
        match self.reduce_all() {
            Ok(value) => Ok(Derivation::success(value)),
            Err(Failure::Parse(err)) => Ok(Derivation::failure(&err, self.symbols.width())),
            Err(Failure::Fatal(err)) => Err(err),
        }
    }

    fn reduce_all(&mut self) -> Result<Dual<T>, Failure> {
        let order = self.tape.order().to_vec();
        let mut last = None;
        for idx in order {
            let node = self.classify(self.tape.pieces(idx))?;
            let value = node.evaluate()?;
            trace!(
                "{} = {} {}",
                self.tape.temporary_name(idx),
                node.op(),
                value
            );
            last = Some(self.symbols.push_temporary(value));
        }
        // The tape never comes out empty, so there is always a last temporary.
        last.and_then(|i| self.symbols.temporary(i).cloned())
            .ok_or(Failure::Parse(ParseError::NoParentheses))
    }

    /// Decides what the interior of a pair means and builds the node for it.
    fn classify(&self, pieces: &[Piece]) -> Result<OpNode<T>, Failure> {
        let infix = self
            .tape
            .split_first(pieces, |c| Operation::from_symbol(c).is_some())
            .and_then(|(lhs, c, rhs)| Some((lhs, Operation::from_symbol(c)?, rhs)));
        if let Some((lhs, op, rhs)) = infix {
            return Ok(self.infix(&lhs, op, &rhs)?);
        }
        if self.tape.rendered_len(pieces) <= BARE_OPERAND_LEN {
            return Ok(self.identity(pieces)?);
        }
        if let Some((Piece::Text(range), rest)) = pieces.split_first() {
            let text = self.tape.text(range);
            if let Some(name) = FUNCTIONS.into_iter().find(|name| text.starts_with(name)) {
                let mut arg = vec![];
                let start = range.start + name.len();
                if start < range.end {
                    arg.push(Piece::Text(start..range.end));
                }
                arg.extend_from_slice(rest);
                return self.application(name, &arg);
            }
        }
        Ok(self.identity(pieces)?)
    }

    fn infix(&self, lhs: &[Piece], op: Operation, rhs: &[Piece]) -> Result<OpNode<T>, ParseError> {
        if rhs.is_empty() {
            return Err(ParseError::MissingOperand);
        }
        let right = self.operand(rhs)?;
        let left = if lhs.is_empty() {
            // Negation: `(-x)` is `(0-x)`.
            if op != Operation::Sub {
                return Err(ParseError::MissingOperand);
            }
            self.symbols.literal(T::zero())
        } else {
            self.operand(lhs)?
        };
        Ok(OpNode::binary(left, right, op))
    }

    /// `(x)` or `(5)`: the operand plus zero. An empty pair `()` is zero.
    fn identity(&self, pieces: &[Piece]) -> Result<OpNode<T>, ParseError> {
        let value = if pieces.is_empty() {
            self.symbols.literal(T::zero())
        } else {
            self.operand(pieces)?
        };
        Ok(OpNode::binary(
            value,
            self.symbols.literal(T::zero()),
            Operation::Add,
        ))
    }

    fn application(&self, name: &'static str, arg: &[Piece]) -> Result<OpNode<T>, Failure> {
        if name == "log" {
            return Ok(self.log_application(arg)?);
        }
        let Some(f) = Elementary::from_name(name) else {
            return Err(ParseError::InvalidArgument(name).into());
        };
        let value = self.argument(f.name(), arg)?;
        Ok(OpNode::unary(value, Operation::Apply(f))?)
    }

    /// `log_BASE_ARG`, where ARG is usually a reduced pair.
    fn log_application(&self, arg: &[Piece]) -> Result<OpNode<T>, ParseError> {
        let invalid = || ParseError::InvalidArgument("log");
        let (head, _, tail) = self
            .tape
            .split_first(arg, |c| c == '_')
            .ok_or_else(invalid)?;
        if !head.is_empty() {
            return Err(invalid());
        }
        let (base, _, arg) = self
            .tape
            .split_first(&tail, |c| c == '_')
            .ok_or_else(invalid)?;
        if base.is_empty() {
            return Err(invalid());
        }
        let base = self.operand(&base)?;
        let value = self.argument("log", &arg)?;
        Ok(OpNode::binary(value, base, Operation::Log))
    }

    fn argument(&self, name: &'static str, arg: &[Piece]) -> Result<Dual<T>, ParseError> {
        if arg.is_empty() {
            return Err(ParseError::InvalidArgument(name));
        }
        self.operand(arg)
            .map_err(|_| ParseError::InvalidArgument(name))
    }

    fn operand(&self, token: &[Piece]) -> Result<Dual<T>, ParseError> {
        match token {
            [Piece::Span(idx)] => self
                .symbols
                .temporary(self.tape.rank(*idx))
                .cloned()
                .ok_or_else(|| ParseError::KeyNotFound(self.tape.temporary_name(*idx))),
            [Piece::Text(range)] => self.symbols.resolve(self.tape.text(range)),
            _ => Err(ParseError::KeyNotFound(self.tape.render(token))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x_seed(value: f64) -> Vec<Seed<f64>> {
        vec![Seed::scalar("x", value, 1.)]
    }

    fn run(expression: &str, seeds: &[Seed<f64>]) -> Derivation<f64> {
        match Reducer::new(expression, seeds) {
            Ok(reducer) => reducer.run().unwrap(),
            Err(err) => Derivation::failure(&err, seed_width(seeds)),
        }
    }

    fn assert_near(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-3, "{a} is not near {b}");
    }

    #[test]
    fn test_integer_parser() {
        let seeds = vec![Seed::scalar("x", 3, 1)];
        let res = Reducer::<i64>::new("((x+5)^3)", &seeds)
            .unwrap()
            .run()
            .unwrap();
        assert!(res.is_success());
        assert_eq!(res.value, Dual::new(512, vec![192]));

        let seeds = vec![Seed::scalar("x", 7, 1)];
        let res = Reducer::<i64>::new("((((x+5)^3)+((x+2)^4))^2)", &seeds)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(res.value.value(), 68707521);
        assert_eq!(res.value.partial(0), Some(55503144));
    }

    #[test]
    fn test_temporaries() {
        let reducer = Reducer::new("((sin(x))*2)", &x_seed(1.)).unwrap();
        assert_eq!(reducer.symbols().width(), 1);
        let res = reducer.run().unwrap();
        assert_near(res.value.value(), 2. * 1f64.sin());
        assert_near(res.value.partials()[0], 2. * 1f64.cos());
    }

    #[test]
    fn test_identity() {
        let res = run("(x)", &x_seed(4.));
        assert_eq!(res.value, Dual::new(4., vec![1.]));
        let res = run("(5)", &x_seed(4.));
        assert_eq!(res.value, Dual::new(5., vec![0.]));
        let res = run("(12.25)", &x_seed(4.));
        assert_eq!(res.value, Dual::new(12.25, vec![0.]));
        let res = run("(((x)))", &x_seed(4.));
        assert_eq!(res.value, Dual::new(4., vec![1.]));
    }

    #[test]
    fn test_empty_pair() {
        let res = run("()", &x_seed(4.));
        assert!(res.is_success());
        assert_eq!(res.value, Dual::zero(1));
        let res = run("((x)+())", &x_seed(4.));
        assert_eq!(res.value, Dual::new(4., vec![1.]));
        let res = run("(cos())", &x_seed(4.));
        assert_eq!(res.value, Dual::new(1., vec![0.]));
    }

    #[test]
    fn test_non_finite_literals() {
        let seeds = x_seed(2.);
        assert_eq!(run("(inf*x)", &seeds).status.message, "Key not found: inf");
        assert_eq!(run("(x+NaN)", &seeds).status.message, "Key not found: NaN");
        assert_eq!(
            run("(infinity)", &seeds).status.message,
            "Key not found: infinity"
        );
        let res = run("(1e2*x)", &seeds);
        assert_eq!(res.value, Dual::new(200., vec![100.]));

        let seeds = vec![Seed::scalar("inf", 3., 1.)];
        assert_eq!(run("(inf*2)", &seeds).value, Dual::new(6., vec![2.]));
    }

    #[test]
    fn test_negation() {
        let res = run("(-x)", &x_seed(4.));
        assert_eq!(res.value, Dual::new(-4., vec![-1.]));
        let res = run("((-2)/(x^x))", &x_seed(1.));
        assert_near(res.value.value(), -2.);
        assert_near(res.value.partials()[0], 2.);
        let res = run("(2*-.3)", &x_seed(1.));
        assert_near(res.value.value(), -0.6);
    }

    #[test]
    fn test_functions() {
        let res = run("(sinh(x))", &x_seed(0.5));
        assert_near(res.value.value(), 0.5f64.sinh());
        assert_near(res.value.partials()[0], 0.5f64.cosh());

        let res = run("(logistic(x))", &x_seed(0.));
        assert_near(res.value.value(), 0.5);

        let res = run("(arctan(x))", &x_seed(1.));
        assert_near(res.value.partials()[0], 0.5);

        let res = run("(log_2_(x))", &x_seed(8.));
        assert_near(res.value.value(), 3.);
        assert_near(res.value.partials()[0], 1. / (8. * 2f64.ln()));

        let res = run("(exp(x/3))", &x_seed(3.));
        assert_near(res.value.value(), 1f64.exp());
        assert_near(res.value.partials()[0], 1f64.exp() / 3.);
    }

    #[test]
    fn test_errors() {
        let seeds = x_seed(2.);
        let err = |e: &str| run(e, &seeds).status.message;
        assert_eq!(err("((x-)+3.7)"), "Binary operation requires LHS and RHS");
        assert_eq!(err("(*x)"), "Binary operation requires LHS and RHS");
        assert_eq!(err("(y^2)"), "Key not found: y");
        assert_eq!(err("(2^z)"), "Key not found: z");
        assert_eq!(err("((sin(4*(x+2)))^z)"), "Key not found: z");
        assert_eq!(err("(foo(x))"), "Key not found: foox0");
        assert_eq!(err("(sin(q))"), "Key not found: q");
        assert_eq!(err("(sinq)"), "Invalid argument to sin");
        assert_eq!(err("(log(x))"), "Invalid argument to log");
        assert_eq!(err("(log_2(x))"), "Invalid argument to log");
        assert_eq!(err("(log_b_(x))"), "Key not found: b");

        let res = run("(y^2)", &seeds);
        assert!(!res.is_success());
        assert_eq!(res.value, Dual::zero(1));
    }

    #[test]
    fn test_fatal_power() {
        let res = Reducer::new("(x^x)", &x_seed(-2.)).unwrap().run();
        assert!(matches!(res, Err(DiffError::UndefinedDerivative { .. })));

        let res = run("(x^3)", &x_seed(-2.));
        assert_near(res.value.value(), -8.);
        assert_near(res.value.partials()[0], 12.);
    }

    #[test]
    fn test_jacobian_width() {
        let seeds = vec![
            Seed::independent("x", 3., 0, 2),
            Seed::independent("y", -1., 1, 2),
        ];
        let res = run("((x^2)+(y^2))", &seeds);
        assert_eq!(res.value, Dual::new(10., vec![6., -2.]));

        let res = run("(3+5)", &seeds);
        assert_eq!(res.value, Dual::new(8., vec![0., 0.]));
    }

    #[test]
    fn test_seed_named_like_temporary() {
        let seeds = vec![Seed::scalar("x0", 2., 1.)];
        let res = run("((x0*x0)+(x0))", &seeds);
        assert_eq!(res.value, Dual::new(6., vec![5.]));
    }
}
