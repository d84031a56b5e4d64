//! Embedding of a model into a richer result type.

use std::marker::PhantomData;

use crate::element::{Element, Embed};
use crate::error::{Result, ResultExt};
use crate::model::{Evaluable, Function, Shared};
use crate::parameters::ParameterPolicy;

/// Evaluates a model of type `In` and embeds the result in `Out`.
///
/// The parameters are those of the wrapped model; the gradient is embedded
/// element by element.
pub struct Cast<In: Element, Out: Element> {
    model: Shared<In>,
    out: PhantomData<Out>,
}

impl<In: Embed<Out>, Out: Element> Cast<In, Out> {
    pub fn new(model: Shared<In>) -> Self {
        Self {
            model,
            out: PhantomData,
        }
    }
}

impl<In: Embed<Out>, Out: Element> Function for Cast<In, Out> {
    fn name(&self) -> String {
        format!("Cast<{},{}>", In::NAME, Out::NAME)
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        self.model.policy()
    }

    fn version(&self) -> u64 {
        self.model.version()
    }
}

impl<In: Embed<Out>, Out: Element> Evaluable for Cast<In, Out> {
    type Result = Out;

    fn evaluate(&self, gradient: Option<&mut Vec<Out>>) -> Result<Out> {
        let mut model_gradient = Vec::new();
        let value = self
            .model
            .evaluate(gradient.is_some().then_some(&mut model_gradient))
            .context(|| format!("{}::calculate", self.name()))?;

        if let Some(gradient) = gradient {
            gradient.clear();
            gradient.extend(model_gradient.iter().map(<In as Embed<Out>>::embed));
        }

        Ok(<In as Embed<Out>>::embed(&value))
    }
}
