//! Snapshots of model parameters.
//!
//! A [`Snapshot`] records the name, value, variance and fit flag of every
//! parameter of a model, and can be written to or read from JSON. Restoring a
//! snapshot writes the recorded values back into a model with the same
//! parameters, e.g. to return to an initial guess after a failed fit.
//!
//! ```rust
//! use meal_rs::models::ScalarParameter;
//! use meal_rs::snapshot::Snapshot;
//! use meal_rs::Function;
//!
//! let model = ScalarParameter::new("gain", 1.0);
//! let snapshot = Snapshot::capture(&model).unwrap();
//!
//! model.set_param(0, 2.5).unwrap();
//! snapshot.restore(&model).unwrap();
//! assert_eq!(model.param(0).unwrap(), 1.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MealError, Result};
use crate::model::Function;
use crate::parameters::Parameter;

/// The parameters of a model at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Name of the model the parameters were read from
    pub model: String,

    /// The parameters, in index order
    pub parameters: Vec<Parameter>,
}

impl Snapshot {
    /// Record the current parameters of `model`.
    pub fn capture<M: Function + ?Sized>(model: &M) -> Result<Self> {
        let mut parameters = Vec::with_capacity(model.nparam());
        for index in 0..model.nparam() {
            let mut param = Parameter::new(&model.param_name(index)?, model.param(index)?);
            param.set_variance(model.variance(index)?)?;
            param.set_infit(model.infit(index)?);
            parameters.push(param);
        }

        Ok(Self {
            model: model.name(),
            parameters,
        })
    }

    /// Write the recorded parameters back into `model`.
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if the model has a different number of
    ///   parameters or a parameter name differs
    pub fn restore<M: Function + ?Sized>(&self, model: &M) -> Result<()> {
        if model.nparam() != self.parameters.len() {
            return Err(MealError::InvalidParam(format!(
                "Snapshot of {} has {} parameters but {} has nparam={}",
                self.model,
                self.parameters.len(),
                model.name(),
                model.nparam()
            )));
        }

        for (index, param) in self.parameters.iter().enumerate() {
            let name = model.param_name(index)?;
            if name != param.name() {
                return Err(MealError::InvalidParam(format!(
                    "Snapshot parameter {} is '{}' but {} has '{}'",
                    index,
                    param.name(),
                    model.name(),
                    name
                )));
            }
        }

        for (index, param) in self.parameters.iter().enumerate() {
            model.set_param(index, param.value())?;
            model.set_variance(index, param.variance())?;
            model.set_infit(index, param.infit())?;
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.model)?;
        for param in &self.parameters {
            let flag = if param.infit() { "" } else { " (fixed)" };
            writeln!(f, "  {} = {}{}", param.name(), param.estimate(), flag)?;
        }
        Ok(())
    }
}
