//! Memoized evaluation.

use std::cell::{Cell, RefCell};

use tracing::trace;

use crate::error::Result;
use crate::model::{Evaluable, Function};
use crate::parameters::ParameterPolicy;

struct Memo<R> {
    version: u64,
    result: R,
    gradient: Option<Vec<R>>,
}

/// Remembers the last evaluation of a model and returns it again until the
/// model's version changes.
pub struct Cached<M: Evaluable> {
    model: M,
    memo: RefCell<Option<Memo<M::Result>>>,
    hits: Cell<usize>,
}

impl<M: Evaluable> Cached<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            memo: RefCell::new(None),
            hits: Cell::new(0),
        }
    }

    /// The wrapped model
    pub fn inner(&self) -> &M {
        &self.model
    }

    /// Number of evaluations answered from the cache
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    /// Forget the last evaluation
    pub fn invalidate(&self) {
        self.memo.borrow_mut().take();
    }
}

impl<M: Evaluable> Function for Cached<M> {
    fn name(&self) -> String {
        format!("Cached<{}>", self.model.name())
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        self.model.policy()
    }

    fn version(&self) -> u64 {
        self.model.version()
    }
}

impl<M: Evaluable> Evaluable for Cached<M> {
    type Result = M::Result;

    fn evaluate(&self, mut gradient: Option<&mut Vec<M::Result>>) -> Result<M::Result> {
        let version = self.model.version();

        if let Some(memo) = self.memo.borrow().as_ref() {
            if memo.version == version {
                let hit = match (&mut gradient, &memo.gradient) {
                    (None, _) => true,
                    (Some(gradient), Some(cached)) => {
                        gradient.clone_from(cached);
                        true
                    }
                    // the gradient was not computed last time
                    (Some(_), None) => false,
                };
                if hit {
                    self.hits.set(self.hits.get() + 1);
                    return Ok(memo.result.clone());
                }
            }
        }

        self.recompute(version, gradient)
    }
}

impl<M: Evaluable> Cached<M> {
    fn recompute(
        &self,
        version: u64,
        gradient: Option<&mut Vec<M::Result>>,
    ) -> Result<M::Result> {
        trace!(model = %self.model.name(), version, "Cached::evaluate recompute");

        let mut computed = Vec::new();
        let result = self.model.evaluate(gradient.is_some().then_some(&mut computed))?;

        let kept = match gradient {
            Some(gradient) => {
                gradient.clone_from(&computed);
                Some(computed)
            }
            None => None,
        };

        *self.memo.borrow_mut() = Some(Memo {
            version,
            result: result.clone(),
            gradient: kept,
        });
        Ok(result)
    }
}
