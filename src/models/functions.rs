//! Elementary functions of scalar models.

use crate::composite::{Composite, Project};
use crate::error::{MealError, Result, ResultExt};
use crate::model::{reset_gradient, Evaluable, Function, ScalarFn};
use crate::parameters::ParameterPolicy;

/// Functions of one scalar argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFunction {
    Sine,
    Cosine,
    Tangent,
    HypSine,
    HypCosine,
    HypTangent,
    Exponential,
    Logarithm,
    Root,
    Absolute,
    InverseHypTangent,
}

impl UnaryFunction {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryFunction::Sine => "Sine",
            UnaryFunction::Cosine => "Cosine",
            UnaryFunction::Tangent => "Tangent",
            UnaryFunction::HypSine => "HypSine",
            UnaryFunction::HypCosine => "HypCosine",
            UnaryFunction::HypTangent => "HypTangent",
            UnaryFunction::Exponential => "Exponential",
            UnaryFunction::Logarithm => "Logarithm",
            UnaryFunction::Root => "SquareRoot",
            UnaryFunction::Absolute => "Absolute",
            UnaryFunction::InverseHypTangent => "InverseHypTangent",
        }
    }

    /// The value of the function and its derivative at `x`
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidParam` if `x` is outside the domain of the function
    pub fn apply(&self, x: f64) -> Result<(f64, f64)> {
        let out_of_domain = |domain: &str| {
            Err(MealError::InvalidParam(format!(
                "{} argument {} outside domain {}",
                self.name(),
                x,
                domain
            )))
        };

        Ok(match self {
            UnaryFunction::Sine => (x.sin(), x.cos()),
            UnaryFunction::Cosine => (x.cos(), -x.sin()),
            UnaryFunction::Tangent => {
                let cos = x.cos();
                (x.tan(), 1.0 / (cos * cos))
            }
            UnaryFunction::HypSine => (x.sinh(), x.cosh()),
            UnaryFunction::HypCosine => (x.cosh(), x.sinh()),
            UnaryFunction::HypTangent => {
                let cosh = x.cosh();
                (x.tanh(), 1.0 / (cosh * cosh))
            }
            UnaryFunction::Exponential => {
                let exp = x.exp();
                (exp, exp)
            }
            UnaryFunction::Logarithm => {
                if x <= 0.0 {
                    return out_of_domain("x > 0");
                }
                (x.ln(), 1.0 / x)
            }
            UnaryFunction::Root => {
                if x < 0.0 {
                    return out_of_domain("x >= 0");
                }
                let root = x.sqrt();
                (root, 0.5 / root)
            }
            UnaryFunction::Absolute => (x.abs(), if x < 0.0 { -1.0 } else { 1.0 }),
            UnaryFunction::InverseHypTangent => {
                if x.abs() >= 1.0 {
                    return out_of_domain("|x| < 1");
                }
                (x.atanh(), 1.0 / (1.0 - x * x))
            }
        })
    }
}

/// `f(g)` for an elementary function `f` of a scalar model `g`.
pub struct UnaryScalar {
    composite: Composite,
    function: UnaryFunction,
    argument: Project<dyn Evaluable<Result = f64>>,
}

impl UnaryScalar {
    pub fn new(function: UnaryFunction, argument: ScalarFn) -> Self {
        let mut composite = Composite::new();
        let argument = Project::new(argument, &mut composite);
        Self {
            composite,
            function,
            argument,
        }
    }

    pub fn function(&self) -> UnaryFunction {
        self.function
    }
}

impl Function for UnaryScalar {
    fn name(&self) -> String {
        self.function.name().to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        self.argument.version()
    }
}

impl Evaluable for UnaryScalar {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        let name = self.name();
        let mut argument_gradient = Vec::new();
        let x = self
            .argument
            .evaluate(gradient.is_some().then_some(&mut argument_gradient))
            .context(|| format!("{}::calculate", name))?;

        let (value, derivative) = self
            .function
            .apply(x)
            .context(|| format!("{}::calculate", name))?;

        if let Some(gradient) = gradient {
            let chained: Vec<f64> = argument_gradient.iter().map(|g| derivative * g).collect();
            reset_gradient(gradient, self.composite.nparam());
            self.composite
                .project_gradient(self.argument.key(), &chained, gradient)
                .context(|| format!("{}::calculate", name))?;
        }

        Ok(value)
    }
}

/// Functions of two scalar arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFunction {
    /// `atan2(y, x)`
    InverseTangent2,
    /// `x^y`
    Power,
}

impl BinaryFunction {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryFunction::InverseTangent2 => "InverseTangent2",
            BinaryFunction::Power => "Power",
        }
    }
}

/// `f(a, b)` for a function of two scalar models.
pub struct BinaryScalar {
    composite: Composite,
    function: BinaryFunction,
    first: Project<dyn Evaluable<Result = f64>>,
    second: Project<dyn Evaluable<Result = f64>>,
}

impl BinaryScalar {
    pub fn new(function: BinaryFunction, first: ScalarFn, second: ScalarFn) -> Self {
        let mut composite = Composite::new();
        let first = Project::new(first, &mut composite);
        let second = Project::new(second, &mut composite);
        Self {
            composite,
            function,
            first,
            second,
        }
    }

    /// The value and the partial derivatives with respect to both arguments
    fn apply(&self, a: f64, b: f64, with_second: bool) -> Result<(f64, f64, f64)> {
        match self.function {
            BinaryFunction::InverseTangent2 => {
                let denominator = a * a + b * b;
                if denominator == 0.0 {
                    return Err(MealError::InvalidParam(format!(
                        "{} undefined at origin",
                        self.name()
                    )));
                }
                Ok((a.atan2(b), b / denominator, -a / denominator))
            }
            BinaryFunction::Power => {
                let value = a.powf(b);
                let da = if b == 0.0 { 0.0 } else { b * a.powf(b - 1.0) };
                let db = if with_second {
                    if a <= 0.0 {
                        return Err(MealError::InvalidParam(format!(
                            "{} base {} must be positive to vary the exponent",
                            self.name(),
                            a
                        )));
                    }
                    value * a.ln()
                } else {
                    0.0
                };
                Ok((value, da, db))
            }
        }
    }
}

impl Function for BinaryScalar {
    fn name(&self) -> String {
        self.function.name().to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        self.first.version() + self.second.version()
    }
}

impl Evaluable for BinaryScalar {
    type Result = f64;

    fn evaluate(&self, gradient: Option<&mut Vec<f64>>) -> Result<f64> {
        let name = self.name();
        let wants_gradient = gradient.is_some();

        let mut first_gradient = Vec::new();
        let a = self
            .first
            .evaluate(wants_gradient.then_some(&mut first_gradient))
            .context(|| format!("{}::calculate", name))?;

        let mut second_gradient = Vec::new();
        let b = self
            .second
            .evaluate(wants_gradient.then_some(&mut second_gradient))
            .context(|| format!("{}::calculate", name))?;

        let with_second = wants_gradient && self.second.nparam() > 0;
        let (value, da, db) = self
            .apply(a, b, with_second)
            .context(|| format!("{}::calculate", name))?;

        if let Some(gradient) = gradient {
            reset_gradient(gradient, self.composite.nparam());
            let first: Vec<f64> = first_gradient.iter().map(|g| da * g).collect();
            self.composite
                .project_gradient(self.first.key(), &first, gradient)
                .context(|| format!("{}::calculate", name))?;
            let second: Vec<f64> = second_gradient.iter().map(|g| db * g).collect();
            self.composite
                .project_gradient(self.second.key(), &second, gradient)
                .context(|| format!("{}::calculate", name))?;
        }

        Ok(value)
    }
}
