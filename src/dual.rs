use num_traits::{One, Zero};

use crate::{error::DiffError, unary_fn::Elementary, Scalar, UnaryFn};

#[derive(Clone, PartialEq, Debug, Default)]
/// A value paired with its partial derivatives, one per independent variable.
///
/// All arithmetic works element-wise over the partials. Binary operations
/// expect both operands to have the same width; extra partials on the wider
/// side are dropped.
pub struct Dual<T = f64> {
    value: T,
    partials: Vec<T>,
}

impl<T: Scalar> Dual<T> {
    pub fn new(value: T, partials: Vec<T>) -> Self {
        Self { value, partials }
    }

    /// A single-variable dual number with derivative `d`.
    pub fn scalar(value: T, d: T) -> Self {
        Self::new(value, vec![d])
    }

    /// A constant with `width` zero partials.
    pub fn constant(value: T, width: usize) -> Self {
        Self::new(value, vec![T::zero(); width])
    }

    pub fn zero(width: usize) -> Self {
        Self::constant(T::zero(), width)
    }

    /// The `index`-th of `width` independent variables, seeded with a one-hot vector.
    pub fn variable(value: T, index: usize, width: usize) -> Self {
        let mut ret = Self::constant(value, width);
        if let Some(d) = ret.partials.get_mut(index) {
            *d = T::one();
        }
        ret
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn partials(&self) -> &[T] {
        &self.partials
    }

    /// Partial derivative with respect to the `index`-th seeded variable.
    pub fn partial(&self, index: usize) -> Option<T> {
        self.partials.get(index).copied()
    }

    pub fn width(&self) -> usize {
        self.partials.len()
    }

    pub fn is_constant(&self) -> bool {
        self.partials.iter().all(|d| d.is_zero())
    }

    pub fn set_value(&mut self, value: T) {
        self.value = value;
    }

    pub fn set_partial(&mut self, index: usize, d: T) {
        if index >= self.partials.len() {
            self.partials.resize(index + 1, T::zero());
        }
        self.partials[index] = d;
    }

    fn zip_with(&self, rhs: &Self, value: T, f: impl Fn(T, T) -> T) -> Self {
        let partials = self
            .partials
            .iter()
            .zip(rhs.partials.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Self::new(value, partials)
    }

    /// Apply an elementary function, scaling every partial by its gradient.
    pub fn apply(&self, f: &impl UnaryFn) -> Self {
        let x = self.value.to_f64();
        let grad = f.grad(x);
        Self::new(
            self.value.map_f64(|x| f.f(x)),
            self.partials
                .iter()
                .map(|d| T::from_f64(grad * d.to_f64()))
                .collect(),
        )
    }

    /// Raise `self` to the power `exp`.
    ///
    /// A zero base yields the zero dual number regardless of the exponent.
    /// A positive base uses the generalized rule
    /// `d(b^e) = b^e (e' ln b + e b' / b)`, which covers variable bases and
    /// variable exponents alike. A negative base only admits a constant
    /// exponent, for which the power rule is used; anything else returns
    /// [`DiffError::UndefinedDerivative`].
    pub fn pow(&self, exp: &Self) -> Result<Self, DiffError> {
        if self.value.is_zero() {
            return Ok(Self::zero(self.width()));
        }
        let b = self.value.to_f64();
        let e = exp.value.to_f64();
        let value = b.powf(e);
        let partials = if self.value > T::zero() {
            self.partials
                .iter()
                .zip(exp.partials.iter())
                .map(|(db, de)| {
                    T::from_f64(value * (de.to_f64() * b.ln() + e * db.to_f64() / b))
                })
                .collect()
        } else {
            if !exp.is_constant() {
                return Err(DiffError::UndefinedDerivative {
                    base: b,
                    exponent: e,
                });
            }
            self.partials
                .iter()
                .map(|db| T::from_f64(e * b.powf(e - 1.) * db.to_f64()))
                .collect()
        };
        Ok(Self::new(T::from_f64(value), partials))
    }

    /// Logarithm of `self` in the given base. The base is treated as a
    /// constant for the derivative.
    pub fn log(&self, base: &Self) -> Self {
        let x = self.value.to_f64();
        let ln_base = base.value.to_f64().ln();
        let grad = 1. / (x * ln_base);
        Self::new(
            self.value.map_f64(|x| x.ln() / ln_base),
            self.partials
                .iter()
                .map(|d| T::from_f64(grad * d.to_f64()))
                .collect(),
        )
    }

    // Division through f64 so that a zero divisor follows IEEE semantics
    // even for integer working types. Also used when the square of an
    // integer divisor wraps to zero.
    fn div_f64(&self, rhs: &Self) -> Self {
        let a = self.value.to_f64();
        let b = rhs.value.to_f64();
        self.zip_with(rhs, T::from_f64(a / b), |da, db| {
            T::from_f64((da.to_f64() * b - db.to_f64() * a) / (b * b))
        })
    }
}

macro_rules! elementary_methods {
    ($($method:ident => $variant:ident),* $(,)?) => {
        impl<T: Scalar> Dual<T> {
            $(
                pub fn $method(&self) -> Self {
                    self.apply(&Elementary::$variant)
                }
            )*
        }
    };
}

elementary_methods!(
    sin => Sin,
    cos => Cos,
    tan => Tan,
    exp => Exp,
    asin => Asin,
    acos => Acos,
    atan => Atan,
    sinh => Sinh,
    cosh => Cosh,
    tanh => Tanh,
    sqrt => Sqrt,
    logistic => Logistic,
);

impl<T: Scalar> std::fmt::Display for Dual<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [", self.value)?;
        for (i, d) in self.partials.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl<T: Scalar> std::ops::Add for &Dual<T> {
    type Output = Dual<T>;
    fn add(self, rhs: &Dual<T>) -> Self::Output {
        self.zip_with(rhs, self.value.wrapping_add(rhs.value), T::wrapping_add)
    }
}

impl<T: Scalar> std::ops::Sub for &Dual<T> {
    type Output = Dual<T>;
    fn sub(self, rhs: &Dual<T>) -> Self::Output {
        self.zip_with(rhs, self.value.wrapping_sub(rhs.value), T::wrapping_sub)
    }
}

impl<T: Scalar> std::ops::Mul for &Dual<T> {
    type Output = Dual<T>;
    fn mul(self, rhs: &Dual<T>) -> Self::Output {
        let (a, b) = (self.value, rhs.value);
        self.zip_with(rhs, a.wrapping_mul(b), |da, db| {
            da.wrapping_mul(b).wrapping_add(db.wrapping_mul(a))
        })
    }
}

impl<T: Scalar> std::ops::Div for &Dual<T> {
    type Output = Dual<T>;
    fn div(self, rhs: &Dual<T>) -> Self::Output {
        let (a, b) = (self.value, rhs.value);
        let bb = b.wrapping_mul(b);
        if bb.is_zero() {
            return self.div_f64(rhs);
        }
        self.zip_with(rhs, a.wrapping_div(b), |da, db| {
            da.wrapping_mul(b)
                .wrapping_sub(db.wrapping_mul(a))
                .wrapping_div(bb)
        })
    }
}

impl<T: Scalar> std::ops::Neg for &Dual<T> {
    type Output = Dual<T>;
    fn neg(self) -> Self::Output {
        &Dual::zero(self.width()) - self
    }
}
