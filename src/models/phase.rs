//! Complex phase factor.

use num_complex::Complex64;

use crate::error::Result;
use crate::model::{Evaluable, Function};
use crate::parameters::{Parameter, ParameterBlock, ParameterPolicy};

/// `exp(iφ)`, parameterized by the phase `φ` in radians.
#[derive(Debug, Clone)]
pub struct Phase {
    block: ParameterBlock,
}

impl Phase {
    pub fn new(phase: f64) -> Self {
        Self {
            block: ParameterBlock::new(Parameter::new("phase", phase)),
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Function for Phase {
    fn name(&self) -> String {
        "Phase".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }
}

impl Evaluable for Phase {
    type Result = Complex64;

    fn evaluate(&self, gradient: Option<&mut Vec<Complex64>>) -> Result<Complex64> {
        let phase = self.block.param(0)?;
        let value = Complex64::from_polar(1.0, phase);

        if let Some(gradient) = gradient {
            gradient.clear();
            gradient.push(Complex64::i() * value);
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::check_gradient;
    use approx::assert_relative_eq;

    #[test]
    fn test_phase() {
        let phase = Phase::new(std::f64::consts::FRAC_PI_2);
        let value = phase.evaluate(None).unwrap();
        assert_relative_eq!(value.re, 0.0, epsilon = 1e-15);
        assert_relative_eq!(value.im, 1.0);
        check_gradient(&phase, 1e-6).unwrap();
    }
}
