//! Parameters of a model constrained by scalar functions.

use tracing::{debug, trace};

use crate::composite::{Composite, Project};
use crate::element::Element;
use crate::error::{MealError, Result, ResultExt};
use crate::model::{reset_gradient, Evaluable, Function, ScalarFn, Shared};
use crate::parameters::ParameterPolicy;

/// A parameter and the scalar that sets its value
struct Constraint {
    parameter: usize,
    scalar: Project<dyn Evaluable<Result = f64>>,
    /// fit flag of the parameter before it was constrained
    infit: bool,
}

/// Reparameterizes a model by scalar functions of other parameters.
///
/// Given a model `M(a)` and a scalar `f(b)` constraining `a_i = f(b)`, the fit
/// flag of `a_i` is cleared and the gradient with respect to `b` follows from
/// `∂M/∂b_k = ∂M/∂a_i ∂f/∂b_k`.
pub struct ChainRule<R: Element> {
    composite: Composite,
    model: Option<Project<dyn Evaluable<Result = R>>>,
    constraints: Vec<Constraint>,
}

impl<R: Element> ChainRule<R> {
    pub fn new() -> Self {
        Self {
            composite: Composite::new(),
            model: None,
            constraints: Vec::new(),
        }
    }

    /// Set the model whose parameters are constrained
    pub fn set_model(&mut self, model: Shared<R>) -> Result<()> {
        for constraint in &self.constraints {
            if constraint.parameter >= model.nparam() {
                return Err(MealError::range(
                    constraint.parameter,
                    model.nparam(),
                    format!("{}::set_model", self.name()),
                ));
            }
        }

        if let Some(old) = self.model.take() {
            debug!(rule = %self.name(), "set_model unmap old model");
            for constraint in &self.constraints {
                old.set_infit(constraint.parameter, constraint.infit)?;
            }
            self.composite.unmap(old.key())?;
        }

        let project = Project::new(model, &mut self.composite);
        for constraint in &mut self.constraints {
            constraint.infit = project.infit(constraint.parameter)?;
            project.set_infit(constraint.parameter, false)?;
        }
        self.model = Some(project);
        Ok(())
    }

    /// The constrained model, if set
    pub fn model(&self) -> Option<&Shared<R>> {
        self.model.as_ref().map(Project::model)
    }

    /// Constrain parameter `iparam` of the model by `scalar`.
    ///
    /// Only one scalar may control a parameter; an existing constraint on
    /// `iparam` is replaced.
    pub fn set_constraint(&mut self, iparam: usize, scalar: ScalarFn) -> Result<()> {
        debug!(rule = %self.name(), iparam, "set_constraint");

        if let Some(model) = &self.model {
            if iparam >= model.nparam() {
                return Err(MealError::range(
                    iparam,
                    model.nparam(),
                    format!("{}::set_constraint", self.name()),
                ));
            }
        }

        if let Some(index) = self.constraints.iter().position(|c| c.parameter == iparam) {
            debug!(rule = %self.name(), iparam, "set_constraint replace");
            let key = self.constraints[index].scalar.key();
            self.composite.unmap(key)?;
            self.constraints[index].scalar = Project::new(scalar, &mut self.composite);
            return Ok(());
        }

        let infit = match &self.model {
            Some(model) => {
                let infit = model.infit(iparam)?;
                model.set_infit(iparam, false)?;
                infit
            }
            None => true,
        };

        let scalar = Project::new(scalar, &mut self.composite);
        self.constraints.push(Constraint {
            parameter: iparam,
            scalar,
            infit,
        });
        Ok(())
    }

    /// Remove the constraint on `iparam` and restore its fit flag
    pub fn remove_constraint(&mut self, iparam: usize) -> Result<()> {
        let index = self
            .constraints
            .iter()
            .position(|c| c.parameter == iparam)
            .ok_or_else(|| {
                MealError::InvalidParam(format!(
                    "{}::remove_constraint parameter {} is not constrained",
                    self.name(),
                    iparam
                ))
            })?;

        let constraint = self.constraints.remove(index);
        self.composite.unmap(constraint.scalar.key())?;
        if let Some(model) = &self.model {
            model.set_infit(iparam, constraint.infit)?;
        }
        Ok(())
    }

    /// Indices of the model parameters currently constrained
    pub fn constrained(&self) -> Vec<usize> {
        self.constraints.iter().map(|c| c.parameter).collect()
    }
}

impl<R: Element> Default for ChainRule<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Element> Function for ChainRule<R> {
    fn name(&self) -> String {
        format!("ChainRule<{}>", R::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        let constraints: u64 = self.constraints.iter().map(|c| c.scalar.version()).sum();
        constraints + self.model.as_ref().map_or(0, |m| m.version())
    }
}

impl<R: Element> Evaluable for ChainRule<R> {
    type Result = R;

    fn evaluate(&self, gradient: Option<&mut Vec<R>>) -> Result<R> {
        let name = self.name();
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| MealError::InvalidState(format!("{}::calculate no model", name)))?;

        let wants_gradient = gradient.is_some();
        let mut scalar_gradients = Vec::with_capacity(self.constraints.len());

        for constraint in &self.constraints {
            trace!(rule = %name, iparam = constraint.parameter, "calculate constraint");

            let mut scalar_gradient = Vec::new();
            let value = constraint
                .scalar
                .evaluate(wants_gradient.then_some(&mut scalar_gradient))
                .context(|| format!("{}::calculate", name))?;
            model
                .set_param(constraint.parameter, value)
                .context(|| format!("{}::calculate", name))?;
            scalar_gradients.push(scalar_gradient);
        }

        let mut model_gradient = Vec::new();
        let result = model
            .evaluate(wants_gradient.then_some(&mut model_gradient))
            .context(|| format!("{}::calculate", name))?;

        if let Some(gradient) = gradient {
            reset_gradient(gradient, self.composite.nparam());
            self.composite
                .project_gradient(model.key(), &model_gradient, gradient)
                .context(|| format!("{}::calculate", name))?;

            for (constraint, scalar_gradient) in self.constraints.iter().zip(&scalar_gradients) {
                // dM/db_k = dM/da_i * da_i/db_k
                let dm = model_gradient.get(constraint.parameter).ok_or_else(|| {
                    MealError::range(constraint.parameter, model_gradient.len(), format!("{}::calculate", name))
                })?;
                let chained: Vec<R> = scalar_gradient.iter().map(|df| dm.scale(*df)).collect();
                self.composite
                    .project_gradient(constraint.scalar.key(), &chained, gradient)
                    .context(|| format!("{}::calculate", name))?;
            }
        }

        Ok(result)
    }
}
