//! Finite difference verification of analytic gradients.
//!
//! Every model returns its own gradient; these helpers estimate the same
//! derivatives with central differences so that the two can be compared.

use crate::element::Element;
use crate::error::{MealError, Result};
use crate::model::Evaluable;

/// Relative step size for central differences.
const DEFAULT_EPSILON: f64 = 1e-5;

/// Compute the gradient of a model using central finite differences.
///
/// Parameter `i` is stepped by `epsilon * max(1, |a_i|)` in both directions
/// and restored afterwards, whether or not the evaluation succeeds.
///
/// # Arguments
///
/// * `model` - The model to differentiate
/// * `epsilon` - The relative step size (optional)
pub fn numerical_gradient<M>(model: &M, epsilon: Option<f64>) -> Result<Vec<M::Result>>
where
    M: Evaluable + ?Sized,
{
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let nparam = model.nparam();
    let mut gradient = Vec::with_capacity(nparam);

    for index in 0..nparam {
        let value = model.param(index)?;
        let step = eps * value.abs().max(1.0);

        let difference = central_difference(model, index, value, step);
        model.set_param(index, value)?;
        gradient.push(difference?);
    }

    Ok(gradient)
}

fn central_difference<M>(model: &M, index: usize, value: f64, step: f64) -> Result<M::Result>
where
    M: Evaluable + ?Sized,
{
    model.set_param(index, value + step)?;
    let plus = model.evaluate(None)?;
    model.set_param(index, value - step)?;
    let minus = model.evaluate(None)?;

    Ok((plus + (-minus)).scale(0.5 / step))
}

/// Compare the analytic gradient of a model with central finite differences.
///
/// Only free parameters are compared: a parameter that is fixed, or driven
/// by a constraint, has no derivative the fit can use. A component passes if
/// `|analytic - numerical| <= tolerance * (1 + |analytic|)`.
///
/// # Errors
///
/// * `MealError::InvalidState` naming the first parameter whose derivatives
///   disagree, or if the analytic gradient has the wrong size
pub fn check_gradient<M>(model: &M, tolerance: f64) -> Result<()>
where
    M: Evaluable + ?Sized,
{
    let mut analytic = Vec::new();
    let value = model.evaluate(Some(&mut analytic))?;

    let nparam = model.nparam();
    if analytic.len() != nparam {
        return Err(MealError::InvalidState(format!(
            "{} gradient has {} elements for nparam={}",
            model.name(),
            analytic.len(),
            nparam
        )));
    }

    let numerical = numerical_gradient(model, None)?;

    // the model must be left where it was found
    let restored = model.evaluate(None)?;
    if restored != value {
        return Err(MealError::InvalidState(format!(
            "{} did not return to {:?} after finite differences",
            model.name(),
            value
        )));
    }

    for (index, (a, n)) in analytic.iter().zip(&numerical).enumerate() {
        if !model.infit(index)? {
            continue;
        }

        let error = (a.clone() + (-n.clone())).norm_sqr().sqrt();
        let scale = 1.0 + a.norm_sqr().sqrt();
        if !(error <= tolerance * scale) {
            return Err(MealError::InvalidState(format!(
                "{} d/d{}: analytic {:?} numerical {:?}",
                model.name(),
                model.param_name(index)?,
                a,
                n
            )));
        }
    }

    Ok(())
}
