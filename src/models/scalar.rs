//! Scalar leaves: a free parameter, a constant and an axis value.

use crate::axis::Axis;
use crate::error::Result;
use crate::model::{reset_gradient, Evaluable, Function};
use crate::parameters::{Parameter, ParameterBlock, ParameterPolicy};

/// A model that evaluates to its only parameter.
#[derive(Debug, Clone)]
pub struct ScalarParameter {
    block: ParameterBlock,
}

impl ScalarParameter {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            block: ParameterBlock::new(Parameter::new(name, value)),
        }
    }

    /// A scalar whose value is held fixed during fits
    pub fn fixed(name: &str, value: f64) -> Self {
        Self {
            block: ParameterBlock::new(Parameter::fixed(name, value)),
        }
    }

    /// Another handle to the same parameter
    pub fn alias(&self) -> Self {
        self.clone()
    }
}

impl Function for ScalarParameter {
    fn name(&self) -> String {
        "ScalarParameter".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }
}

impl Evaluable for ScalarParameter {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        if let Some(gradient) = gradient {
            gradient.clear();
            gradient.push(1.0);
        }
        self.block.param(0)
    }
}

/// A constant without parameters.
#[derive(Debug, Clone)]
pub struct ScalarValue {
    block: ParameterBlock,
    value: f64,
}

impl ScalarValue {
    pub fn new(value: f64) -> Self {
        Self {
            block: ParameterBlock::empty(),
            value,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Function for ScalarValue {
    fn name(&self) -> String {
        "ScalarValue".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }
}

impl Evaluable for ScalarValue {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        if let Some(gradient) = gradient {
            gradient.clear();
        }
        Ok(self.value)
    }
}

/// The current value of an axis, without parameters.
#[derive(Debug, Clone)]
pub struct ScalarArgument {
    block: ParameterBlock,
    axis: Axis<f64>,
}

impl ScalarArgument {
    pub fn new(axis: &Axis<f64>) -> Self {
        Self {
            block: ParameterBlock::empty(),
            axis: axis.clone(),
        }
    }
}

impl Function for ScalarArgument {
    fn name(&self) -> String {
        "ScalarArgument".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }

    fn version(&self) -> u64 {
        self.axis.version()
    }
}

impl Evaluable for ScalarArgument {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        if let Some(gradient) = gradient {
            reset_gradient(gradient, 0);
        }
        Ok(self.axis.get())
    }
}
