//! Jones matrices of rotations and boosts about a fixed axis.
//!
//! A unit 3-vector `n` selects the axis through the Pauli matrices
//!
//! ```text
//! σ1 = | 1  0 |    σ2 = | 0  1 |    σ3 = | 0 -i |
//!      | 0 -1 |         | 1  0 |         | i  0 |
//! ```
//!
//! A rotation by `φ` is the unitary matrix `cos φ I + i sin φ (n·σ)` and a
//! boost by `β` is the Hermitian matrix `cosh β I + sinh β (n·σ)`.

use num_complex::Complex64;

use crate::element::{Element, Jones};
use crate::error::{MealError, Result};
use crate::model::{Evaluable, Function};
use crate::parameters::{Parameter, ParameterBlock, ParameterPolicy};

fn unit_axis(axis: [f64; 3]) -> Result<[f64; 3]> {
    let norm = axis.iter().map(|a| a * a).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(MealError::InvalidParam(format!(
            "axis {:?} cannot be normalized",
            axis
        )));
    }
    Ok([axis[0] / norm, axis[1] / norm, axis[2] / norm])
}

/// `n·σ` for a real 3-vector `n`
fn pauli(n: &[f64; 3]) -> Jones {
    let re = |x: f64| Complex64::new(x, 0.0);
    Jones::new(
        re(n[0]),
        Complex64::new(n[1], -n[2]),
        Complex64::new(n[1], n[2]),
        re(-n[0]),
    )
}

fn scaled(j: &Jones, factor: f64) -> Jones {
    Element::scale(j, factor)
}

/// Rotation by an angle about a fixed axis.
#[derive(Debug, Clone)]
pub struct Rotation {
    block: ParameterBlock,
    axis: [f64; 3],
}

impl Rotation {
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if `axis` has zero length
    pub fn new(axis: [f64; 3], angle: f64) -> Result<Self> {
        Ok(Self {
            block: ParameterBlock::new(Parameter::new("rotation", angle)),
            axis: unit_axis(axis)?,
        })
    }

    pub fn axis(&self) -> [f64; 3] {
        self.axis
    }
}

impl Function for Rotation {
    fn name(&self) -> String {
        "Rotation".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }
}

impl Evaluable for Rotation {
    type Result = Jones;

    fn evaluate(&self, gradient: Option<&mut Vec<Jones>>) -> Result<Jones> {
        let phi = self.block.param(0)?;
        let (sin, cos) = phi.sin_cos();
        let generator = pauli(&self.axis).map(|z| z * Complex64::i());

        if let Some(gradient) = gradient {
            gradient.clear();
            gradient.push(scaled(&Jones::identity(), -sin) + scaled(&generator, cos));
        }

        Ok(scaled(&Jones::identity(), cos) + scaled(&generator, sin))
    }
}

/// Boost by a rapidity about a fixed axis.
#[derive(Debug, Clone)]
pub struct Boost {
    block: ParameterBlock,
    axis: [f64; 3],
}

impl Boost {
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if `axis` has zero length
    pub fn new(axis: [f64; 3], beta: f64) -> Result<Self> {
        Ok(Self {
            block: ParameterBlock::new(Parameter::new("boost", beta)),
            axis: unit_axis(axis)?,
        })
    }

    pub fn axis(&self) -> [f64; 3] {
        self.axis
    }
}

impl Function for Boost {
    fn name(&self) -> String {
        "Boost".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }
}

impl Evaluable for Boost {
    type Result = Jones;

    fn evaluate(&self, gradient: Option<&mut Vec<Jones>>) -> Result<Jones> {
        let beta = self.block.param(0)?;
        let (sinh, cosh) = (beta.sinh(), beta.cosh());
        let generator = pauli(&self.axis);

        if let Some(gradient) = gradient {
            gradient.clear();
            gradient.push(scaled(&Jones::identity(), sinh) + scaled(&generator, cosh));
        }

        Ok(scaled(&Jones::identity(), cosh) + scaled(&generator, sinh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::check_gradient;
    use approx::assert_relative_eq;

    fn assert_jones_eq(a: &Jones, b: &Jones) {
        for (x, y) in a.iter().zip(b.iter()) {
            assert_relative_eq!(x.re, y.re, epsilon = 1e-12);
            assert_relative_eq!(x.im, y.im, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotation_is_unitary() {
        let rotation = Rotation::new([0.0, 0.0, 2.0], 0.4).unwrap();
        assert_eq!(rotation.axis(), [0.0, 0.0, 1.0]);

        let j = rotation.evaluate(None).unwrap();
        assert_jones_eq(&(j * j.adjoint()), &Jones::identity());
        check_gradient(&rotation, 1e-6).unwrap();
    }

    #[test]
    fn test_boost_is_hermitian() {
        let boost = Boost::new([1.0, 1.0, 0.0], 0.3).unwrap();
        let j = boost.evaluate(None).unwrap();
        assert_jones_eq(&j, &j.adjoint());

        // det = cosh² - sinh² = 1
        let det = j[(0, 0)] * j[(1, 1)] - j[(0, 1)] * j[(1, 0)];
        assert_relative_eq!(det.re, 1.0, epsilon = 1e-12);
        check_gradient(&boost, 1e-6).unwrap();
    }

    #[test]
    fn test_zero_axis_rejected() {
        assert!(Rotation::new([0.0; 3], 1.0).is_err());
        assert!(Boost::new([0.0; 3], 1.0).is_err());
    }
}
