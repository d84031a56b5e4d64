//! Negation and inverse of a single model.

use tracing::trace;

use crate::composite::{Composite, Project};
use crate::element::Element;
use crate::error::{MealError, Result, ResultExt};
use crate::model::{reset_gradient, share, Evaluable, Function, Shared};
use crate::parameters::ParameterPolicy;
use crate::rules::group::{Product, Sum};

/// `-f`, the unary case of the sum.
pub struct Negation<R: Element> {
    composite: Composite,
    model: Project<dyn Evaluable<Result = R>>,
}

impl<R: Element> Negation<R> {
    pub fn new(model: Shared<R>) -> Self {
        let mut composite = Composite::new();
        let model = Project::new(model, &mut composite);
        Self { composite, model }
    }
}

impl<R: Element> Function for Negation<R> {
    fn name(&self) -> String {
        format!("Negation<{}>", R::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        self.model.version()
    }
}

impl<R: Element> Evaluable for Negation<R> {
    type Result = R;

    fn evaluate(&self, gradient: Option<&mut Vec<R>>) -> Result<R> {
        let mut model_gradient = Vec::new();
        let value = self
            .model
            .evaluate(gradient.is_some().then_some(&mut model_gradient))
            .context(|| format!("{}::calculate", self.name()))?;

        if let Some(gradient) = gradient {
            let negated: Vec<R> = model_gradient.into_iter().map(|g| -g).collect();
            reset_gradient(gradient, self.composite.nparam());
            self.composite
                .project_gradient(self.model.key(), &negated, gradient)
                .context(|| format!("{}::calculate", self.name()))?;
        }

        Ok(-value)
    }
}

/// `f⁻¹`, with gradient `-f⁻¹ (∂f) f⁻¹`.
pub struct Inverse<R: Element> {
    composite: Composite,
    model: Project<dyn Evaluable<Result = R>>,
}

impl<R: Element> Inverse<R> {
    pub fn new(model: Shared<R>) -> Self {
        let mut composite = Composite::new();
        let model = Project::new(model, &mut composite);
        Self { composite, model }
    }
}

impl<R: Element> Function for Inverse<R> {
    fn name(&self) -> String {
        format!("Inverse<{}>", R::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        self.model.version()
    }
}

impl<R: Element> Evaluable for Inverse<R> {
    type Result = R;

    fn evaluate(&self, gradient: Option<&mut Vec<R>>) -> Result<R> {
        let name = self.name();
        let mut model_gradient = Vec::new();
        let value = self
            .model
            .evaluate(gradient.is_some().then_some(&mut model_gradient))
            .context(|| format!("{}::calculate", name))?;

        let inverse = value.inverse().ok_or_else(|| {
            MealError::InvalidParam(format!("{}::calculate singular value {:?}", name, value))
        })?;
        trace!(model = %name, "calculate inverted");

        if let Some(gradient) = gradient {
            let projected: Vec<R> = model_gradient
                .into_iter()
                .map(|g| -(inverse.clone() * g * inverse.clone()))
                .collect();
            reset_gradient(gradient, self.composite.nparam());
            self.composite
                .project_gradient(self.model.key(), &projected, gradient)
                .context(|| format!("{}::calculate", name))?;
        }

        Ok(inverse)
    }
}

/// `a - b`, the sum of `a` and the negation of `b`
pub fn difference<R: Element>(a: Shared<R>, b: Shared<R>) -> Sum<R> {
    let mut sum = Sum::new();
    sum.add_model(a);
    sum.add_model(share(Negation::new(b)));
    sum
}

/// `a b⁻¹`, the product of `a` and the inverse of `b`
pub fn quotient<R: Element>(a: Shared<R>, b: Shared<R>) -> Product<R> {
    let mut product = Product::new();
    product.add_model(a);
    product.add_model(share(Inverse::new(b)));
    product
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::ScalarParameter;
    use crate::utils::check_gradient;
    use approx::assert_relative_eq;

    #[test]
    fn test_negation() {
        let negation = Negation::new(share(ScalarParameter::new("a", 2.5)));
        let mut gradient = Vec::new();
        assert_eq!(negation.evaluate(Some(&mut gradient)).unwrap(), -2.5);
        assert_eq!(gradient, vec![-1.0]);
    }

    #[test]
    fn test_inverse_gradient() {
        let inverse = Inverse::new(share(ScalarParameter::new("a", 4.0)));
        let mut gradient = Vec::new();
        assert_relative_eq!(inverse.evaluate(Some(&mut gradient)).unwrap(), 0.25);
        assert_relative_eq!(gradient[0], -1.0 / 16.0);
        check_gradient(&inverse, 1e-6).unwrap();
    }

    #[test]
    fn test_inverse_of_zero() {
        let inverse = Inverse::new(share(ScalarParameter::new("a", 0.0)));
        let err = inverse.evaluate(None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
        assert!(format!("{}", err).contains("Inverse<Scalar>::calculate"));
    }

    #[test]
    fn test_difference_and_quotient() {
        let a = share(ScalarParameter::new("a", 6.0));
        let b = share(ScalarParameter::new("b", 2.0));

        let diff = difference(a.clone(), b.clone());
        assert_relative_eq!(diff.evaluate(None).unwrap(), 4.0);

        let ratio = quotient(a, b);
        let mut gradient = Vec::new();
        assert_relative_eq!(ratio.evaluate(Some(&mut gradient)).unwrap(), 3.0);
        assert_relative_eq!(gradient[0], 0.5);
        assert_relative_eq!(gradient[1], -1.5);
    }
}
