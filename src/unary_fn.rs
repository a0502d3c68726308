/// A trait that represents an elementary function of one argument.
/// It needs to implement the transformation of the value and its derivative,
/// which the dual algebra multiplies into every partial (chain rule).
pub trait UnaryFn {
    fn name(&self) -> &'static str;
    fn f(&self, data: f64) -> f64;
    fn grad(&self, data: f64) -> f64;
}

/// The named one-argument functions of the expression language.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Elementary {
    Sin,
    Cos,
    Tan,
    Exp,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Sqrt,
    Logistic,
}

impl Elementary {
    pub const ALL: [Elementary; 12] = [
        Self::Sin,
        Self::Cos,
        Self::Tan,
        Self::Exp,
        Self::Asin,
        Self::Acos,
        Self::Atan,
        Self::Sinh,
        Self::Cosh,
        Self::Tanh,
        Self::Sqrt,
        Self::Logistic,
    ];

    /// Looks up a function by the name it is written with in an expression.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }
}

impl UnaryFn for Elementary {
    fn name(&self) -> &'static str {
        use Elementary::*;
        match self {
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Exp => "exp",
            Asin => "arcsin",
            Acos => "arccos",
            Atan => "arctan",
            Sinh => "sinh",
            Cosh => "cosh",
            Tanh => "tanh",
            Sqrt => "sqrt",
            Logistic => "logistic",
        }
    }

    fn f(&self, x: f64) -> f64 {
        use Elementary::*;
        match self {
            Sin => x.sin(),
            Cos => x.cos(),
            Tan => x.tan(),
            Exp => x.exp(),
            Asin => x.asin(),
            Acos => x.acos(),
            Atan => x.atan(),
            Sinh => x.sinh(),
            Cosh => x.cosh(),
            Tanh => x.tanh(),
            Sqrt => x.sqrt(),
            Logistic => x.exp() / (1. + x.exp()),
        }
    }

    fn grad(&self, x: f64) -> f64 {
        use Elementary::*;
        match self {
            Sin => x.cos(),
            Cos => -x.sin(),
            Tan => 1. / x.cos().powi(2),
            Exp => x.exp(),
            Asin => 1. / (1. - x * x).sqrt(),
            Acos => -1. / (1. - x * x).sqrt(),
            Atan => 1. / (1. + x * x),
            Sinh => x.cosh(),
            Cosh => x.sinh(),
            Tanh => 1. / x.cosh().powi(2),
            Sqrt => 0.5 * x.powf(-0.5),
            Logistic => x.exp() / (1. + x.exp()).powi(2),
        }
    }
}

#[test]
fn test_names_round_trip() {
    for e in Elementary::ALL {
        assert_eq!(Elementary::from_name(e.name()), Some(e));
    }
    assert_eq!(Elementary::from_name("log"), None);
}

#[test]
fn test_grad() {
    let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
    assert!(close(Elementary::Tan.grad(0.), 1.));
    assert!(close(Elementary::Asin.grad(0.), 1.));
    assert!(close(Elementary::Acos.grad(0.), -1.));
    assert!(close(Elementary::Logistic.f(0.), 0.5));
    assert!(close(Elementary::Logistic.grad(0.), 0.25));
    assert!(close(Elementary::Sqrt.grad(4.), 0.25));
    assert!(Elementary::Sqrt.f(-1.).is_nan());
}
