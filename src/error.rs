//! Error types.
//!
//! [`ParseError`] is recoverable and reaches callers as a [`Status`].
//! [`DiffError`] is a contract violation that aborts the evaluation path
//! and travels as the `Err` side of a `Result`.

use std::fmt::Display;

use thiserror::Error;

use crate::node::Operation;

/// Structural problems in an expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unbalanced parentheses -- too many '('")]
    TooManyOpen,

    #[error("Unbalanced parentheses -- too many ')'")]
    TooManyClose,

    #[error("No parentheses found.")]
    NoParentheses,

    #[error("Binary operation requires LHS and RHS")]
    MissingOperand,

    /// A token is neither a bound identifier nor a literal of the working type.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A named function was applied to something that cannot be resolved.
    #[error("Invalid argument to {0}")]
    InvalidArgument(&'static str),
}

/// Failures that are not expressible as a [`Status`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiffError {
    /// A negative base raised to an exponent that depends on a variable.
    /// The derivative is complex or undefined there.
    #[error("Derivative not defined or complex: base {base} raised to a non-constant exponent {exponent}")]
    UndefinedDerivative { base: f64, exponent: f64 },

    /// A binary operation was built without its auxiliary operand.
    #[error("Auxiliary operand is needed for binary operation `{0}`")]
    MissingAuxiliary(Operation),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ReturnCode {
    #[default]
    Success,
    ParseError,
}

/// The outcome of a `derive` call. Callers must check the code before
/// trusting the value that accompanies it.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Status {
    pub code: ReturnCode,
    pub message: String,
}

impl Status {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.code == ReturnCode::Success
    }
}

impl From<&ParseError> for Status {
    fn from(err: &ParseError) -> Self {
        Self {
            code: ReturnCode::ParseError,
            message: err.to_string(),
        }
    }
}

impl From<ParseError> for Status {
    fn from(err: ParseError) -> Self {
        Self::from(&err)
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            ReturnCode::Success => write!(f, "success"),
            ReturnCode::ParseError => write!(f, "parse error: {}", self.message),
        }
    }
}

impl std::error::Error for Status {}

#[test]
fn test_messages() {
    assert_eq!(
        Status::from(ParseError::TooManyOpen).message,
        "Unbalanced parentheses -- too many '('"
    );
    assert_eq!(
        ParseError::KeyNotFound("y".into()).to_string(),
        "Key not found: y"
    );
    assert_eq!(
        ParseError::InvalidArgument("sin").to_string(),
        "Invalid argument to sin"
    );
    let status = Status::from(&ParseError::NoParentheses);
    assert_eq!(status.code, ReturnCode::ParseError);
    assert!(!status.is_success());
    assert!(Status::success().is_success());
}
