//! An array of models, one of which is selected at a time.

use std::cell::Cell;

use crate::composite::{Composite, Project};
use crate::element::Element;
use crate::error::{MealError, Result, ResultExt};
use crate::model::{reset_gradient, Evaluable, Function, Shared};
use crate::parameters::ParameterPolicy;

/// Evaluates to the currently selected element of a list of models.
///
/// The parameter space is the union of the parameters of every element; the
/// gradient is zero for parameters that the current element does not use.
pub struct VectorRule<R: Element> {
    composite: Composite,
    models: Vec<Project<dyn Evaluable<Result = R>>>,
    index: Cell<usize>,
    selections: Cell<u64>,
}

impl<R: Element> VectorRule<R> {
    pub fn new() -> Self {
        Self {
            composite: Composite::new(),
            models: Vec::new(),
            index: Cell::new(0),
            selections: Cell::new(0),
        }
    }

    /// Append a model; the new element becomes the current one
    pub fn push_back(&mut self, model: Shared<R>) {
        let project = Project::new(model, &mut self.composite);
        self.models.push(project);
        self.select(self.models.len() - 1);
    }

    /// Number of elements
    pub fn size(&self) -> usize {
        self.models.len()
    }

    /// Index of the current element
    pub fn index(&self) -> usize {
        self.index.get()
    }

    /// Select the element used for evaluation
    pub fn set_index(&self, index: usize) -> Result<()> {
        if index >= self.models.len() {
            return Err(MealError::range(
                index,
                self.models.len(),
                format!("{}::set_index", self.name()),
            ));
        }
        self.select(index);
        Ok(())
    }

    fn select(&self, index: usize) {
        if self.index.get() != index {
            self.selections.set(self.selections.get() + 1);
        }
        self.index.set(index);
    }
}

impl<R: Element> Default for VectorRule<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Element> Function for VectorRule<R> {
    fn name(&self) -> String {
        format!("VectorRule<{}>", R::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        let models: u64 = self.models.iter().map(|m| m.version()).sum();
        models + self.selections.get()
    }
}

impl<R: Element> Evaluable for VectorRule<R> {
    type Result = R;

    fn evaluate(&self, gradient: Option<&mut Vec<R>>) -> Result<R> {
        let name = self.name();
        let model = self
            .models
            .get(self.index.get())
            .ok_or_else(|| MealError::InvalidState(format!("{}::calculate no models", name)))?;

        let mut model_gradient = Vec::new();
        let result = model
            .evaluate(gradient.is_some().then_some(&mut model_gradient))
            .context(|| format!("{}::calculate", name))?;

        if let Some(gradient) = gradient {
            reset_gradient(gradient, self.composite.nparam());
            self.composite
                .project_gradient(model.key(), &model_gradient, gradient)
                .context(|| format!("{}::calculate", name))?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::share;
    use crate::models::ScalarParameter;

    #[test]
    fn test_selection() {
        let mut rule = VectorRule::new();
        rule.push_back(share(ScalarParameter::new("a", 1.0)));
        rule.push_back(share(ScalarParameter::new("b", 2.0)));
        assert_eq!(rule.size(), 2);
        assert_eq!(rule.index(), 1);
        assert_eq!(rule.nparam(), 2);

        let mut gradient = Vec::new();
        assert_eq!(rule.evaluate(Some(&mut gradient)).unwrap(), 2.0);
        assert_eq!(gradient, vec![0.0, 1.0]);

        let version = rule.version();
        rule.set_index(0).unwrap();
        assert!(rule.version() > version);
        assert_eq!(rule.evaluate(Some(&mut gradient)).unwrap(), 1.0);
        assert_eq!(gradient, vec![1.0, 0.0]);
    }

    #[test]
    fn test_invalid_index() {
        let rule = VectorRule::<f64>::new();
        assert_eq!(rule.evaluate(None).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(rule.set_index(0).unwrap_err().kind(), ErrorKind::InvalidRange);
    }
}
