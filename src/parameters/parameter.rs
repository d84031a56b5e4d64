//! Parameter definition and implementation
//!
//! This module provides the Parameter struct, which is the fundamental building
//! block of the parameter system: a named value with a variance and a flag
//! that says whether the value is free to vary in a fit.

use crate::error::{MealError, Result};
use crate::estimate::Estimate;
use serde::{Deserialize, Serialize};

/// A model parameter
///
/// The value is never renormalized here; models that need to keep their
/// parameters on some manifold (unit vectors, angles) do so themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter
    name: String,

    /// Current value of the parameter
    value: f64,

    /// Variance of the value; zero if it has not been estimated
    variance: f64,

    /// Whether this parameter is varied during a fit
    infit: bool,
}

impl Parameter {
    /// Create a new free parameter with the given name and value
    ///
    /// # Examples
    ///
    /// ```
    /// use meal_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("amplitude", 10.0);
    /// assert_eq!(param.name(), "amplitude");
    /// assert_eq!(param.value(), 10.0);
    /// assert_eq!(param.variance(), 0.0);
    /// assert!(param.infit());
    /// ```
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
            variance: 0.0,
            infit: true,
        }
    }

    /// Create a parameter that is held fixed during fits
    pub fn fixed(name: &str, value: f64) -> Self {
        Self {
            infit: false,
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn set_value(&mut self, value: f64) {
        self.value = value;
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    /// Set the variance of the parameter
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if the variance is negative or NaN
    pub fn set_variance(&mut self, variance: f64) -> Result<()> {
        if variance.is_nan() || variance < 0.0 {
            return Err(MealError::InvalidParam(format!(
                "variance of '{}' must be non-negative, got {}",
                self.name, variance
            )));
        }
        self.variance = variance;
        Ok(())
    }

    pub fn infit(&self) -> bool {
        self.infit
    }

    pub fn set_infit(&mut self, infit: bool) {
        self.infit = infit;
    }

    /// The value and its variance
    pub fn estimate(&self) -> Estimate<f64> {
        Estimate::new(self.value, self.variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_creation() {
        let param = Parameter::new("amplitude", 10.0);
        assert_eq!(param.name(), "amplitude");
        assert_eq!(param.value(), 10.0);
        assert!(param.infit());

        let param = Parameter::fixed("frequency", 2.0);
        assert_eq!(param.value(), 2.0);
        assert!(!param.infit());
    }

    #[test]
    fn test_flags_independent_of_value() {
        let mut param = Parameter::new("phase", 0.5);
        param.set_infit(false);
        param.set_value(0.75);
        param.set_variance(0.01).unwrap();

        assert!(!param.infit());
        assert_eq!(param.name(), "phase");
        assert_eq!(param.estimate(), Estimate::new(0.75, 0.01));
    }

    #[test]
    fn test_negative_variance_rejected() {
        let mut param = Parameter::new("phase", 0.5);
        assert!(param.set_variance(-1.0).is_err());
        assert!(param.set_variance(f64::NAN).is_err());
        assert_eq!(param.variance(), 0.0);
    }
}
