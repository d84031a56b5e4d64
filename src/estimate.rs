//! Values paired with their variance.
//!
//! An [`Estimate`] carries a value and its variance and propagates the
//! variance through arithmetic with the first-order rule
//! `var(f(x)) = (df/dx)² var(x)`, treating operands as uncorrelated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

/// A value and its variance.
///
/// The value type `T` may be any model result (scalar, complex or Jones
/// matrix); the variance `U` is a scalar by default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Estimate<T, U = f64> {
    /// The value
    pub val: T,
    /// The variance of the value
    pub var: U,
}

impl<T, U> Estimate<T, U> {
    pub fn new(val: T, var: U) -> Self {
        Self { val, var }
    }
}

impl Estimate<f64> {
    /// An exact value (zero variance).
    pub fn exact(val: f64) -> Self {
        Self { val, var: 0.0 }
    }

    /// Standard deviation, the square root of the variance.
    pub fn error(&self) -> f64 {
        self.var.sqrt()
    }

    /// Apply `f` with derivative `df` at the current value.
    fn propagate(&self, value: f64, derivative: f64) -> Self {
        Self {
            val: value,
            var: derivative * derivative * self.var,
        }
    }

    pub fn exp(&self) -> Self {
        let value = self.val.exp();
        self.propagate(value, value)
    }

    pub fn ln(&self) -> Self {
        self.propagate(self.val.ln(), 1.0 / self.val)
    }

    pub fn sqrt(&self) -> Self {
        let value = self.val.sqrt();
        self.propagate(value, 0.5 / value)
    }

    pub fn sin(&self) -> Self {
        self.propagate(self.val.sin(), self.val.cos())
    }

    pub fn cos(&self) -> Self {
        self.propagate(self.val.cos(), -self.val.sin())
    }

    pub fn abs(&self) -> Self {
        Self {
            val: self.val.abs(),
            var: self.var,
        }
    }

    pub fn powf(&self, exponent: f64) -> Self {
        self.propagate(
            self.val.powf(exponent),
            exponent * self.val.powf(exponent - 1.0),
        )
    }

    /// Four-quadrant arctangent of `self / x`.
    pub fn atan2(&self, x: &Estimate<f64>) -> Self {
        let y = self;
        let denom = x.val * x.val + y.val * y.val;
        let dy = x.val / denom;
        let dx = -y.val / denom;
        Self {
            val: y.val.atan2(x.val),
            var: dy * dy * y.var + dx * dx * x.var,
        }
    }
}

impl Add for Estimate<f64> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.val + rhs.val, self.var + rhs.var)
    }
}

impl AddAssign for Estimate<f64> {
    fn add_assign(&mut self, rhs: Self) {
        self.val += rhs.val;
        self.var += rhs.var;
    }
}

impl Sub for Estimate<f64> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.val - rhs.val, self.var + rhs.var)
    }
}

impl Mul for Estimate<f64> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.val * rhs.val,
            rhs.val * rhs.val * self.var + self.val * self.val * rhs.var,
        )
    }
}

impl Div for Estimate<f64> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let inverse = 1.0 / rhs.val;
        let value = self.val * inverse;
        Self::new(
            value,
            (self.var + value * value * rhs.var) * inverse * inverse,
        )
    }
}

impl Neg for Estimate<f64> {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.val, self.var)
    }
}

impl Add<f64> for Estimate<f64> {
    type Output = Self;
    fn add(self, rhs: f64) -> Self {
        Self::new(self.val + rhs, self.var)
    }
}

impl Mul<f64> for Estimate<f64> {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.val * rhs, self.var * rhs * rhs)
    }
}

impl From<f64> for Estimate<f64> {
    fn from(val: f64) -> Self {
        Self::exact(val)
    }
}

impl fmt::Display for Estimate<f64> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} ± {})", self.val, self.error())
    }
}
