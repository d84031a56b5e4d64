//! Random perturbation of model parameters.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{MealError, Result};
use crate::model::Function;

/// Add Gaussian noise to every free parameter of a model.
///
/// The standard deviation for parameter `a_i` is `scale * max(1, |a_i|)`;
/// fixed parameters are left alone.
///
/// # Errors
///
/// * `MealError::InvalidParam` if `scale` is negative or not finite
pub fn randomize_parameters<M, R>(model: &M, rng: &mut R, scale: f64) -> Result<()>
where
    M: Function + ?Sized,
    R: Rng + ?Sized,
{
    if !(scale >= 0.0) || !scale.is_finite() {
        return Err(MealError::InvalidParam(format!(
            "randomize_parameters scale={} must be finite and non-negative",
            scale
        )));
    }

    for index in 0..model.nparam() {
        if !model.infit(index)? {
            continue;
        }

        let value = model.param(index)?;
        let normal = Normal::new(0.0, scale * value.abs().max(1.0))
            .map_err(|e| MealError::InvalidParam(format!("randomize_parameters: {}", e)))?;
        model.set_param(index, value + normal.sample(rng))?;
    }

    Ok(())
}
