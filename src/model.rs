//! Function and Evaluable traits.
//!
//! This module defines the contract every model satisfies: indexed parameter
//! access through [`Function`] and value-plus-gradient evaluation through
//! [`Evaluable`]. Leaf models implement both directly; the rules in
//! [`crate::rules`] build new models out of shared existing ones.

use std::rc::Rc;

use num_complex::Complex64;

use crate::element::Element;
use crate::error::Result;
use crate::estimate::Estimate;
use crate::parameters::{ParameterBlock, ParameterPolicy};

/// A model with named, indexed parameters.
///
/// All accessors delegate to [`Function::policy`]; implementors normally only
/// provide `name` and `policy`, and override `version` when the evaluation
/// also depends on something other than parameters (an axis, child models).
pub trait Function {
    /// Return the name of the model
    fn name(&self) -> String;

    /// The parameter policy of the model
    fn policy(&self) -> &dyn ParameterPolicy;

    /// Counter that increases whenever the evaluation may have changed
    fn version(&self) -> u64 {
        self.policy().version()
    }

    /// Return the number of parameters
    fn nparam(&self) -> usize {
        self.policy().nparam()
    }

    /// Return the name of the specified parameter
    fn param_name(&self, index: usize) -> Result<String> {
        self.policy().param_name(index)
    }

    /// Return the value of the specified parameter
    fn param(&self, index: usize) -> Result<f64> {
        self.policy().param(index)
    }

    /// Set the value of the specified parameter
    fn set_param(&self, index: usize, value: f64) -> Result<()> {
        self.policy().set_param(index, value)
    }

    /// Return the variance of the specified parameter
    fn variance(&self, index: usize) -> Result<f64> {
        self.policy().variance(index)
    }

    /// Set the variance of the specified parameter
    fn set_variance(&self, index: usize, variance: f64) -> Result<()> {
        self.policy().set_variance(index, variance)
    }

    /// Return true if the parameter at index is to be fitted
    fn infit(&self, index: usize) -> Result<bool> {
        self.policy().infit(index)
    }

    /// Set the flag for the parameter at index to be fitted
    fn set_infit(&self, index: usize, flag: bool) -> Result<()> {
        self.policy().set_infit(index, flag)
    }

    /// Return the value and variance of the specified parameter
    fn estimate(&self, index: usize) -> Result<Estimate<f64>> {
        Ok(Estimate::new(self.param(index)?, self.variance(index)?))
    }

    /// Set the value and variance of the specified parameter
    fn set_estimate(&self, index: usize, estimate: Estimate<f64>) -> Result<()> {
        self.set_param(index, estimate.val)?;
        self.set_variance(index, estimate.var)
    }

    /// The distinct leaf parameter blocks of the model
    fn blocks(&self) -> Vec<ParameterBlock> {
        self.policy().blocks()
    }
}

/// A model that evaluates to a value of type `Self::Result`.
pub trait Evaluable: Function {
    type Result: Element;

    /// Return the value of the model and, if requested, its gradient.
    ///
    /// When `gradient` is supplied it is resized to exactly `nparam()` entries
    /// and `gradient[i]` is the partial derivative of the result with respect
    /// to parameter `i`.
    fn evaluate(&self, gradient: Option<&mut Vec<Self::Result>>) -> Result<Self::Result>;
}

/// Shared handle to a model returning `R`.
pub type Shared<R> = Rc<dyn Evaluable<Result = R>>;

/// Shared handle to a real-valued model.
pub type ScalarFn = Shared<f64>;

/// Shared handle to a complex-valued model.
pub type ComplexFn = Shared<Complex64>;

/// Shared handle to a Jones-matrix-valued model.
#[cfg(feature = "matrix")]
pub type JonesFn = Shared<crate::element::Jones>;

/// Wrap a model in a shared handle.
pub fn share<M>(model: M) -> Shared<M::Result>
where
    M: Evaluable + 'static,
{
    Rc::new(model)
}

/// Evaluate a real-valued model and propagate the parameter variances.
///
/// The variance of the result is `Σ (df/da_i)² var(a_i)`, ignoring any
/// covariance between parameters.
pub fn evaluate_estimate<M>(model: &M) -> Result<Estimate<f64>>
where
    M: Evaluable<Result = f64> + ?Sized,
{
    let mut gradient = Vec::new();
    let value = model.evaluate(Some(&mut gradient))?;

    let mut variance = 0.0;
    for (index, g) in gradient.iter().enumerate() {
        variance += g * g * model.variance(index)?;
    }

    Ok(Estimate::new(value, variance))
}

/// Prepare a gradient buffer of `nparam` zeros.
pub(crate) fn reset_gradient<R: Element>(gradient: &mut Vec<R>, nparam: usize) {
    gradient.clear();
    gradient.resize(nparam, R::zero());
}
