use std::fmt::Display;

use crate::{error::DiffError, unary_fn::Elementary, Dual, Scalar, UnaryFn};

/// The operator tag carried by an [`OpNode`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Logarithm of the primary operand in the base given by the auxiliary one.
    Log,
    Apply(Elementary),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arity {
    Unary,
    Binary,
}

impl Operation {
    /// The infix operator written with a single character, if any.
    pub fn from_symbol(c: char) -> Option<Self> {
        Some(match c {
            '+' => Self::Add,
            '-' => Self::Sub,
            '*' => Self::Mul,
            '/' => Self::Div,
            '^' => Self::Pow,
            _ => return None,
        })
    }

    pub fn arity(&self) -> Arity {
        match self {
            Self::Apply(_) => Arity::Unary,
            _ => Arity::Binary,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::Log => "log",
            Self::Apply(f) => f.name(),
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One operator applied to one or two dual numbers, evaluated once.
#[derive(Clone, Debug)]
pub struct OpNode<T> {
    primary: Dual<T>,
    auxiliary: Option<Dual<T>>,
    op: Operation,
}

impl<T: Scalar> OpNode<T> {
    /// Builds a node without an auxiliary operand. Fails right away if the
    /// operation needs two operands.
    pub fn unary(primary: Dual<T>, op: Operation) -> Result<Self, DiffError> {
        if op.arity() == Arity::Binary {
            return Err(DiffError::MissingAuxiliary(op));
        }
        Ok(Self {
            primary,
            auxiliary: None,
            op,
        })
    }

    /// Builds a node with both operands. The auxiliary operand of a unary
    /// operation is ignored.
    pub fn binary(primary: Dual<T>, auxiliary: Dual<T>, op: Operation) -> Self {
        Self {
            primary,
            auxiliary: Some(auxiliary),
            op,
        }
    }

    pub fn op(&self) -> Operation {
        self.op
    }

    pub fn evaluate(&self) -> Result<Dual<T>, DiffError> {
        use Operation::*;
        let lhs = &self.primary;
        match (self.op, &self.auxiliary) {
            (Apply(f), _) => Ok(lhs.apply(&f)),
            (Add, Some(rhs)) => Ok(lhs + rhs),
            (Sub, Some(rhs)) => Ok(lhs - rhs),
            (Mul, Some(rhs)) => Ok(lhs * rhs),
            (Div, Some(rhs)) => Ok(lhs / rhs),
            (Pow, Some(rhs)) => lhs.pow(rhs),
            (Log, Some(rhs)) => Ok(lhs.log(rhs)),
            (op, None) => Err(DiffError::MissingAuxiliary(op)),
        }
    }
}

#[test]
fn test_unary_rejects_binary_op() {
    let x = Dual::scalar(2., 1.);
    for op in [
        Operation::Add,
        Operation::Sub,
        Operation::Mul,
        Operation::Div,
        Operation::Pow,
        Operation::Log,
    ] {
        assert_eq!(
            OpNode::unary(x.clone(), op).unwrap_err(),
            DiffError::MissingAuxiliary(op)
        );
    }
    assert!(OpNode::unary(x, Operation::Apply(Elementary::Sin)).is_ok());
}

#[test]
fn test_evaluate() {
    let x = Dual::scalar(2., 1.);
    let c = Dual::constant(3., 1);
    let node = OpNode::binary(x.clone(), c.clone(), Operation::Mul);
    assert_eq!(node.evaluate().unwrap(), Dual::new(6., vec![3.]));

    let node = OpNode::binary(x.clone(), c, Operation::Apply(Elementary::Exp));
    assert_eq!(node.evaluate().unwrap(), x.exp());

    let node = OpNode::unary(x.clone(), Operation::Apply(Elementary::Cos)).unwrap();
    assert_eq!(node.op(), Operation::Apply(Elementary::Cos));
    assert_eq!(node.evaluate().unwrap(), x.cos());
}

#[test]
fn test_evaluate_dispatch() {
    let x = Dual::scalar(8., 1.);
    let c = Dual::constant(2., 1);
    let eval = |op| OpNode::binary(x.clone(), c.clone(), op).evaluate().unwrap();
    assert_eq!(eval(Operation::Add), &x + &c);
    assert_eq!(eval(Operation::Sub), &x - &c);
    assert_eq!(eval(Operation::Mul), &x * &c);
    assert_eq!(eval(Operation::Div), &x / &c);
    assert_eq!(eval(Operation::Pow), x.pow(&c).unwrap());
    assert_eq!(eval(Operation::Log), x.log(&c));
}

#[test]
fn test_symbols() {
    assert_eq!(Operation::from_symbol('^'), Some(Operation::Pow));
    assert_eq!(Operation::from_symbol('%'), None);
    assert_eq!(Operation::Apply(Elementary::Asin).to_string(), "arcsin");
    assert_eq!(Operation::Log.arity(), Arity::Binary);
}
