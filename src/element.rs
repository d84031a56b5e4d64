//! The kinds of value a model can return.
//!
//! Every model evaluates to an [`Element`]: a real scalar, a complex number
//! or (with the `matrix` feature) a 2x2 complex Jones matrix. The trait
//! supplies the group identities used by the algebraic rules and the inner
//! product used by the least-squares solver.

use num_complex::Complex64;
use std::fmt::Debug;
use std::ops::{Add, Mul, Neg};

/// Result type of an evaluable model.
pub trait Element:
    Clone + Debug + PartialEq + Add<Output = Self> + Mul<Output = Self> + Neg<Output = Self> + 'static
{
    /// Short name used in model names and diagnostics
    const NAME: &'static str;

    /// Additive identity
    fn zero() -> Self;

    /// Multiplicative identity
    fn one() -> Self;

    /// Multiply every component by a real factor
    fn scale(&self, factor: f64) -> Self;

    /// Multiplicative inverse, or `None` if the element is singular
    fn inverse(&self) -> Option<Self>;

    /// Real inner product, `Re(Σ conj(a_k) b_k)` over all components
    fn inner(&self, other: &Self) -> f64;

    /// Squared norm, the inner product of the element with itself
    fn norm_sqr(&self) -> f64 {
        self.inner(self)
    }

    /// True if every component is finite
    fn is_finite(&self) -> bool;
}

impl Element for f64 {
    const NAME: &'static str = "Scalar";

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    fn scale(&self, factor: f64) -> Self {
        *self * factor
    }

    fn inverse(&self) -> Option<Self> {
        if *self == 0.0 {
            None
        } else {
            Some(1.0 / self)
        }
    }

    fn inner(&self, other: &Self) -> f64 {
        self * other
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
}

impl Element for Complex64 {
    const NAME: &'static str = "Complex";

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn one() -> Self {
        Complex64::new(1.0, 0.0)
    }

    fn scale(&self, factor: f64) -> Self {
        *self * factor
    }

    fn inverse(&self) -> Option<Self> {
        if Complex64::norm_sqr(self) == 0.0 {
            None
        } else {
            Some(self.inv())
        }
    }

    fn inner(&self, other: &Self) -> f64 {
        (self.conj() * *other).re
    }

    fn is_finite(&self) -> bool {
        Complex64::is_finite(*self)
    }
}

/// A 2x2 complex matrix, the Jones representation of a polarimetric transformation.
#[cfg(feature = "matrix")]
pub type Jones = nalgebra::Matrix2<Complex64>;

#[cfg(feature = "matrix")]
impl Element for Jones {
    const NAME: &'static str = "Jones";

    fn zero() -> Self {
        Jones::zeros()
    }

    fn one() -> Self {
        Jones::identity()
    }

    fn scale(&self, factor: f64) -> Self {
        self.map(|z| z * factor)
    }

    fn inverse(&self) -> Option<Self> {
        let det = self[(0, 0)] * self[(1, 1)] - self[(0, 1)] * self[(1, 0)];
        if det.norm_sqr() == 0.0 {
            return None;
        }
        let inv_det = det.inv();
        Some(Jones::new(
            self[(1, 1)] * inv_det,
            -self[(0, 1)] * inv_det,
            -self[(1, 0)] * inv_det,
            self[(0, 0)] * inv_det,
        ))
    }

    fn inner(&self, other: &Self) -> f64 {
        self.iter()
            .zip(other.iter())
            .map(|(a, b)| (a.conj() * b).re)
            .sum()
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|z| z.is_finite())
    }
}

/// Embeds one kind of result into a richer one, used by the `Cast` rule.
pub trait Embed<T: Element>: Element {
    fn embed(&self) -> T;
}

impl<T: Element> Embed<T> for T {
    fn embed(&self) -> T {
        self.clone()
    }
}

impl Embed<Complex64> for f64 {
    fn embed(&self) -> Complex64 {
        Complex64::new(*self, 0.0)
    }
}

#[cfg(feature = "matrix")]
impl Embed<Jones> for f64 {
    fn embed(&self) -> Jones {
        Element::scale(&Jones::identity(), *self)
    }
}

#[cfg(feature = "matrix")]
impl Embed<Jones> for Complex64 {
    fn embed(&self) -> Jones {
        Jones::identity().map(|z| z * *self)
    }
}
