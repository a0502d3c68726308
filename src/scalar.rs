use std::fmt::{Debug, Display};
use std::str::FromStr;

use num_traits::Num;

/// A trait that represents the working numeric type of an evaluation.
///
/// Implementations are provided for `f64`, `f32`, `i64` and `i32`.
/// Ring operations run natively in the type and wrap on integer overflow;
/// transcendental functions go through `f64` and are converted back, so
/// integer types see rounded results.
pub trait Scalar:
    Num + Copy + PartialOrd + FromStr + Debug + Display + Default + Send + Sync + 'static
{
    fn to_f64(self) -> f64;

    /// Lossy conversion back from `f64`. Integer types round and saturate,
    /// and NaN becomes zero.
    fn from_f64(v: f64) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_mul(self, rhs: Self) -> Self;

    /// Division by a non-zero divisor.
    fn wrapping_div(self, rhs: Self) -> Self;

    /// Applies a real function through `f64`.
    fn map_f64(self, f: impl FnOnce(f64) -> f64) -> Self {
        Self::from_f64(f(self.to_f64()))
    }
}

macro_rules! impl_scalar {
    (float: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(v: f64) -> Self {
                    v as $t
                }

                fn wrapping_add(self, rhs: Self) -> Self {
                    self + rhs
                }

                fn wrapping_sub(self, rhs: Self) -> Self {
                    self - rhs
                }

                fn wrapping_mul(self, rhs: Self) -> Self {
                    self * rhs
                }

                fn wrapping_div(self, rhs: Self) -> Self {
                    self / rhs
                }
            }
        )*
    };
    (int: $($t:ty),*) => {
        $(
            impl Scalar for $t {
                fn to_f64(self) -> f64 {
                    self as f64
                }

                // Rounds so that exact results computed through f64
                // (e.g. 2916.0000000000005) do not lose one.
                fn from_f64(v: f64) -> Self {
                    v.round() as $t
                }

                fn wrapping_add(self, rhs: Self) -> Self {
                    <$t>::wrapping_add(self, rhs)
                }

                fn wrapping_sub(self, rhs: Self) -> Self {
                    <$t>::wrapping_sub(self, rhs)
                }

                fn wrapping_mul(self, rhs: Self) -> Self {
                    <$t>::wrapping_mul(self, rhs)
                }

                fn wrapping_div(self, rhs: Self) -> Self {
                    <$t>::wrapping_div(self, rhs)
                }
            }
        )*
    };
}

impl_scalar!(float: f64, f32);
impl_scalar!(int: i64, i32);

#[test]
fn test_scalar_conversion() {
    assert_eq!(<i64 as Scalar>::from_f64(192.7), 193);
    assert_eq!(<i64 as Scalar>::from_f64(-0.41), 0);
    assert_eq!(<i32 as Scalar>::from_f64(f64::NAN), 0);
    assert_eq!(<i64 as Scalar>::from_f64(f64::INFINITY), i64::MAX);
    assert!(<f32 as Scalar>::from_f64(f64::NAN).is_nan());
    assert_eq!(3i32.map_f64(|x| x * 1.5), 5);
}

#[test]
fn test_wrapping() {
    assert_eq!(Scalar::wrapping_mul(i64::MAX, 2), -2);
    assert_eq!(Scalar::wrapping_add(i32::MAX, 1), i32::MIN);
    assert_eq!(Scalar::wrapping_div(i64::MIN, -1), i64::MIN);
    assert_eq!(Scalar::wrapping_mul(1.5f64, 2.), 3.);
}
