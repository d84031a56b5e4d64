//! Polynomial of one independent variable.

use crate::axis::Axis;
use crate::error::{MealError, Result};
use crate::model::{Evaluable, Function};
use crate::parameters::{Parameter, ParameterBlock, ParameterPolicy};

/// A polynomial model
///
/// The polynomial is defined as:
///
/// f(x) = c_0 + c_1 * x + c_2 * x^2 + ... + c_n * x^n
///
/// where x is read from an [`Axis`] and the coefficients `c_k` are the
/// parameters, named `c_0` through `c_n`.
#[derive(Debug, Clone)]
pub struct Polynomial {
    block: ParameterBlock,
    axis: Axis<f64>,
}

impl Polynomial {
    /// Create a polynomial with `ncoef` zero coefficients
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if `ncoef` is zero
    pub fn new(ncoef: usize, axis: &Axis<f64>) -> Result<Self> {
        Self::with_coefficients(&vec![0.0; ncoef], axis)
    }

    /// Create a polynomial with the given coefficients, lowest order first
    pub fn with_coefficients(coefficients: &[f64], axis: &Axis<f64>) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(MealError::InvalidParam(
                "Polynomial requires at least one coefficient".to_string(),
            ));
        }

        let params = coefficients
            .iter()
            .enumerate()
            .map(|(k, &c)| Parameter::new(&format!("c_{}", k), c))
            .collect::<Vec<_>>();

        Ok(Self {
            block: ParameterBlock::new(params),
            axis: axis.clone(),
        })
    }

    /// The polynomial degree
    pub fn degree(&self) -> usize {
        self.block.nparam() - 1
    }

    /// Current coefficients, lowest order first
    pub fn coefficients(&self) -> Vec<f64> {
        self.block.parameters().iter().map(Parameter::value).collect()
    }
}

impl Function for Polynomial {
    fn name(&self) -> String {
        "Polynomial".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }

    fn version(&self) -> u64 {
        self.block.version() + self.axis.version()
    }
}

impl Evaluable for Polynomial {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        let x = self.axis.get();
        let coefficients = self.coefficients();

        // Horner's method, highest order first
        let value = coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c);

        if let Some(gradient) = gradient {
            gradient.clear();
            let mut power = 1.0;
            for _ in 0..coefficients.len() {
                gradient.push(power);
                power *= x;
            }
        }

        Ok(value)
    }
}
