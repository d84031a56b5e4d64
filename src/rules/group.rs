//! Associative combinations of an ordered list of models.

use std::marker::PhantomData;

use tracing::trace;

use crate::composite::{Composite, Project};
use crate::element::Element;
use crate::error::{MealError, Result, ResultExt};
use crate::model::{reset_gradient, Evaluable, Function, Shared};
use crate::parameters::ParameterPolicy;

/// The binary operation of a [`GroupRule`].
pub trait GroupOperation<R: Element> {
    /// Name of the rule, used in model names and error traces
    const NAME: &'static str;

    /// The identity of the group
    fn identity() -> R;

    /// Combine `element` into `total`
    fn operate(total: &mut R, element: &R);

    /// Factor applied to the gradient of the other elements
    fn partial(element: &R) -> R;
}

/// Addition: `identity = 0`, `partial = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumOp;

impl<R: Element> GroupOperation<R> for SumOp {
    const NAME: &'static str = "Sum";

    fn identity() -> R {
        R::zero()
    }

    fn operate(total: &mut R, element: &R) {
        *total = total.clone() + element.clone();
    }

    fn partial(_element: &R) -> R {
        R::zero()
    }
}

/// Multiplication in list order: `identity = 1`, `partial = element`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductOp;

impl<R: Element> GroupOperation<R> for ProductOp {
    const NAME: &'static str = "Product";

    fn identity() -> R {
        R::one()
    }

    fn operate(total: &mut R, element: &R) {
        *total = total.clone() * element.clone();
    }

    fn partial(element: &R) -> R {
        element.clone()
    }
}

/// A model formed by combining child models with a group operation.
///
/// Children are combined in the order they were added, which matters for
/// non-commuting results such as Jones matrices.
pub struct GroupRule<R: Element, Op> {
    composite: Composite,
    models: Vec<Project<dyn Evaluable<Result = R>>>,
    op: PhantomData<Op>,
}

/// The sum of the child models.
pub type Sum<R = f64> = GroupRule<R, SumOp>;

/// The ordered product of the child models.
pub type Product<R = f64> = GroupRule<R, ProductOp>;

impl<R: Element, Op: GroupOperation<R>> GroupRule<R, Op> {
    pub fn new() -> Self {
        Self {
            composite: Composite::new(),
            models: Vec::new(),
            op: PhantomData,
        }
    }

    /// Append a model to the list of elements
    pub fn add_model(&mut self, model: Shared<R>) {
        trace!(rule = %self.name(), model = %model.name(), "add_model");
        let project = Project::new(model, &mut self.composite);
        self.models.push(project);
    }

    /// Number of elements
    pub fn nmodel(&self) -> usize {
        self.models.len()
    }

    /// The element at `index`
    pub fn model(&self, index: usize) -> Result<&Shared<R>> {
        self.models
            .get(index)
            .map(Project::model)
            .ok_or_else(|| MealError::range(index, self.models.len(), format!("{}::model", self.name())))
    }
}

impl<R: Element, Op: GroupOperation<R>> Default for GroupRule<R, Op> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Element, Op: GroupOperation<R>> Function for GroupRule<R, Op> {
    fn name(&self) -> String {
        format!("{}<{}>", Op::NAME, R::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.composite
    }

    fn version(&self) -> u64 {
        self.models.iter().map(|m| m.version()).sum()
    }
}

impl<R: Element, Op: GroupOperation<R>> Evaluable for GroupRule<R, Op> {
    type Result = R;

    fn evaluate(&self, gradient: Option<&mut Vec<R>>) -> Result<R> {
        let name = self.name();
        let wants_gradient = gradient.is_some();

        // one slot per child parameter, in child order; duplicates are summed
        // when the slots are projected into the composite space
        let total_nparam = if wants_gradient {
            self.models.iter().map(|m| m.nparam()).sum()
        } else {
            0
        };
        let mut slots = vec![Op::identity(); total_nparam];

        let mut result = Op::identity();
        let mut element_gradient = Vec::new();
        let mut igradient = 0;

        for model in &self.models {
            trace!(rule = %name, model = %model.name(), "calculate evaluate");

            let element = model
                .evaluate(wants_gradient.then_some(&mut element_gradient))
                .context(|| format!("{}::calculate", name))?;

            Op::operate(&mut result, &element);

            if !wants_gradient {
                continue;
            }

            let ngrad = element_gradient.len();
            if ngrad != model.nparam() {
                return Err(MealError::InvalidState(format!(
                    "{}::calculate {}.nparam={} != gradient.size={}",
                    name,
                    model.name(),
                    model.nparam(),
                    ngrad
                )));
            }

            let partial = Op::partial(&element);
            for slot in &mut slots[..igradient] {
                Op::operate(slot, &partial);
            }
            for (slot, g) in slots[igradient..igradient + ngrad]
                .iter_mut()
                .zip(&element_gradient)
            {
                Op::operate(slot, g);
            }
            for slot in &mut slots[igradient + ngrad..] {
                Op::operate(slot, &partial);
            }

            igradient += ngrad;
        }

        if let Some(gradient) = gradient {
            reset_gradient(gradient, self.composite.nparam());

            let mut offset = 0;
            for model in &self.models {
                let n = model.nparam();
                self.composite
                    .project_gradient(model.key(), &slots[offset..offset + n], gradient)
                    .context(|| format!("{}::calculate", name))?;
                offset += n;
            }
        }

        Ok(result)
    }
}
