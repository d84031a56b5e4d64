//! Arithmetic expressions of scalar models.
//!
//! [`ScalarMath`] wraps a shared scalar model and overloads the arithmetic
//! operators, so that expressions such as `a * sin(b * x) + c` build the
//! corresponding tree of rules. Every intermediate result is itself a model
//! with a gradient.
//!
//! ```rust
//! use meal_rs::models::{math, ScalarMath, ScalarParameter};
//!
//! let a = ScalarMath::from(ScalarParameter::new("a", 2.0));
//! let b = ScalarMath::from(ScalarParameter::new("b", 0.5));
//!
//! let expression = a.clone() * math::exp(b) + 1.0;
//! let value = expression.evaluate().unwrap();
//! assert!((value - (2.0 * 0.5_f64.exp() + 1.0)).abs() < 1e-12);
//! ```

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use std::rc::Rc;

use crate::error::Result;
use crate::estimate::Estimate;
use crate::model::{evaluate_estimate, share, Evaluable, ScalarFn};
use crate::models::functions::{BinaryFunction, BinaryScalar, UnaryFunction, UnaryScalar};
use crate::models::scalar::{ScalarParameter, ScalarValue};
use crate::rules::{Inverse, Negation, Product, Sum};

/// A scalar model that supports arithmetic.
#[derive(Clone)]
pub struct ScalarMath {
    expression: ScalarFn,
}

impl ScalarMath {
    pub fn new(expression: ScalarFn) -> Self {
        Self { expression }
    }

    /// The shared model built so far
    pub fn model(&self) -> &ScalarFn {
        &self.expression
    }

    /// The shared model built so far, consuming the expression
    pub fn into_model(self) -> ScalarFn {
        self.expression
    }

    /// Evaluate the expression
    pub fn evaluate(&self) -> Result<f64> {
        self.expression.evaluate(None)
    }

    /// Evaluate the expression with the variance propagated from its parameters
    pub fn estimate(&self) -> Result<Estimate<f64>> {
        evaluate_estimate(&*self.expression)
    }

    fn unary(function: UnaryFunction, x: ScalarMath) -> Self {
        Self::new(share(UnaryScalar::new(function, x.expression)))
    }

    fn binary(function: BinaryFunction, a: ScalarMath, b: ScalarMath) -> Self {
        Self::new(share(BinaryScalar::new(function, a.expression, b.expression)))
    }
}

impl From<f64> for ScalarMath {
    fn from(value: f64) -> Self {
        Self::new(share(ScalarValue::new(value)))
    }
}

impl From<ScalarParameter> for ScalarMath {
    fn from(parameter: ScalarParameter) -> Self {
        Self::new(share(parameter))
    }
}

impl From<ScalarFn> for ScalarMath {
    fn from(expression: ScalarFn) -> Self {
        Self::new(expression)
    }
}

impl From<ScalarMath> for ScalarFn {
    fn from(math: ScalarMath) -> Self {
        math.expression
    }
}

impl Add for ScalarMath {
    type Output = ScalarMath;

    fn add(self, rhs: ScalarMath) -> ScalarMath {
        let mut sum = Sum::new();
        sum.add_model(self.expression);
        sum.add_model(rhs.expression);
        ScalarMath::new(Rc::new(sum))
    }
}

impl Sub for ScalarMath {
    type Output = ScalarMath;

    fn sub(self, rhs: ScalarMath) -> ScalarMath {
        self + (-rhs)
    }
}

impl Mul for ScalarMath {
    type Output = ScalarMath;

    fn mul(self, rhs: ScalarMath) -> ScalarMath {
        let mut product = Product::new();
        product.add_model(self.expression);
        product.add_model(rhs.expression);
        ScalarMath::new(Rc::new(product))
    }
}

impl Div for ScalarMath {
    type Output = ScalarMath;

    fn div(self, rhs: ScalarMath) -> ScalarMath {
        self * ScalarMath::new(share(Inverse::new(rhs.expression)))
    }
}

impl Neg for ScalarMath {
    type Output = ScalarMath;

    fn neg(self) -> ScalarMath {
        ScalarMath::new(share(Negation::new(self.expression)))
    }
}

macro_rules! scalar_operators {
    ($($trait:ident $method:ident $assign_trait:ident $assign:ident),*) => {$(
        impl $trait<f64> for ScalarMath {
            type Output = ScalarMath;

            fn $method(self, rhs: f64) -> ScalarMath {
                $trait::$method(self, ScalarMath::from(rhs))
            }
        }

        impl $trait<ScalarMath> for f64 {
            type Output = ScalarMath;

            fn $method(self, rhs: ScalarMath) -> ScalarMath {
                $trait::$method(ScalarMath::from(self), rhs)
            }
        }

        impl $assign_trait for ScalarMath {
            fn $assign(&mut self, rhs: ScalarMath) {
                *self = $trait::$method(self.clone(), rhs);
            }
        }
    )*};
}

scalar_operators!(
    Add add AddAssign add_assign,
    Sub sub SubAssign sub_assign,
    Mul mul MulAssign mul_assign,
    Div div DivAssign div_assign
);

pub fn sqrt(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Root, x)
}

pub fn abs(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Absolute, x)
}

pub fn sin(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Sine, x)
}

pub fn cos(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Cosine, x)
}

pub fn tan(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Tangent, x)
}

pub fn sinh(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::HypSine, x)
}

pub fn cosh(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::HypCosine, x)
}

pub fn tanh(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::HypTangent, x)
}

pub fn exp(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Exponential, x)
}

pub fn log(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::Logarithm, x)
}

pub fn atanh(x: ScalarMath) -> ScalarMath {
    ScalarMath::unary(UnaryFunction::InverseHypTangent, x)
}

pub fn atan2(y: ScalarMath, x: ScalarMath) -> ScalarMath {
    ScalarMath::binary(BinaryFunction::InverseTangent2, y, x)
}

pub fn pow(x: ScalarMath, y: ScalarMath) -> ScalarMath {
    ScalarMath::binary(BinaryFunction::Power, x, y)
}
