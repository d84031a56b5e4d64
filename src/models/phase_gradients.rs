//! Phase gradients with respect to an independent variable.

use std::cell::{Cell, RefCell};

use num_complex::Complex64;
use tracing::trace;

use crate::axis::Axis;
use crate::error::{MealError, Result};
use crate::model::{reset_gradient, Evaluable, Function};
use crate::parameters::{Parameter, ParameterBlock, ParameterPolicy};

/// `exp(i (φ_k + δ_k) x)` for the selected one of several phase gradients.
///
/// Each gradient `φ_k` is a parameter named `phi_k`, paired with a fixed
/// offset `δ_k`. Only the selected gradient enters the value, so the
/// gradient with respect to every other `φ_j` is zero. Fitting several data
/// sets to one template uses one gradient per data set, selected before each
/// is evaluated; a single gradient models one shift shared by all of them.
///
/// The result is a complex scalar; wrap it in
/// [`Cast`](crate::rules::Cast) to use it as a Jones matrix.
///
/// ```
/// use meal_rs::axis::Axis;
/// use meal_rs::models::PhaseGradients;
/// use meal_rs::{Evaluable, Function};
///
/// let axis = Axis::new(0.5);
/// let gradients = PhaseGradients::new(2, &axis);
/// assert_eq!(gradients.param_name(1).unwrap(), "phi_1");
/// assert_eq!(gradients.igradient(), 1);
///
/// gradients.set_param(1, std::f64::consts::PI).unwrap();
/// let value = gradients.evaluate(None).unwrap();
/// assert!((value.im - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug)]
pub struct PhaseGradients {
    block: ParameterBlock,
    axis: Axis<f64>,
    offsets: RefCell<Vec<f64>>,
    igradient: Cell<usize>,
    changes: Cell<u64>,
}

impl PhaseGradients {
    /// Create `ngradient` zero gradients of `axis`; the last one is selected
    pub fn new(ngradient: usize, axis: &Axis<f64>) -> Self {
        let gradients = Self {
            block: ParameterBlock::empty(),
            axis: axis.clone(),
            offsets: RefCell::new(Vec::new()),
            igradient: Cell::new(0),
            changes: Cell::new(0),
        };
        gradients.resize(ngradient);
        gradients
    }

    /// Number of gradients
    pub fn ngradient(&self) -> usize {
        self.block.nparam()
    }

    /// Index of the selected gradient
    pub fn igradient(&self) -> usize {
        self.igradient.get()
    }

    /// Select the gradient used for evaluation
    pub fn set_igradient(&self, igradient: usize) -> Result<()> {
        if igradient == self.igradient.get() && igradient < self.ngradient() {
            return Ok(());
        }
        if igradient >= self.ngradient() {
            return Err(MealError::range(
                igradient,
                self.ngradient(),
                "PhaseGradients::set_igradient",
            ));
        }
        self.igradient.set(igradient);
        self.changed();
        Ok(())
    }

    /// Offset added to gradient `igradient`
    pub fn offset(&self, igradient: usize) -> Result<f64> {
        self.offsets
            .borrow()
            .get(igradient)
            .copied()
            .ok_or_else(|| MealError::range(igradient, self.ngradient(), "PhaseGradients::offset"))
    }

    /// Set the offset added to gradient `igradient`
    pub fn set_offset(&self, igradient: usize, offset: f64) -> Result<()> {
        let ngradient = self.ngradient();
        {
            let mut offsets = self.offsets.borrow_mut();
            let slot = offsets
                .get_mut(igradient)
                .ok_or_else(|| MealError::range(igradient, ngradient, "PhaseGradients::set_offset"))?;
            *slot = offset;
        }
        self.changed();
        Ok(())
    }

    /// Append a gradient and select it
    pub fn add_gradient(&self) {
        self.resize(self.ngradient() + 1);
    }

    /// Remove the last gradient
    ///
    /// # Errors
    ///
    /// * `MealError::InvalidState` if there are no gradients
    pub fn remove_gradient(&self) -> Result<()> {
        let ngradient = self.ngradient().checked_sub(1).ok_or_else(|| {
            MealError::InvalidState("PhaseGradients::remove_gradient no gradients".to_string())
        })?;
        self.resize(ngradient);
        Ok(())
    }

    /// Set the number of gradients.
    ///
    /// New gradients start at zero with zero offset; after any change the
    /// last gradient is selected. Resize before adding the model to a parent.
    pub fn resize(&self, ngradient: usize) {
        if ngradient == self.ngradient() {
            return;
        }

        self.block
            .resize(ngradient, |k| Parameter::new(&format!("phi_{}", k), 0.0));
        self.offsets.borrow_mut().resize(ngradient, 0.0);
        self.igradient.set(ngradient.saturating_sub(1));
        self.changed();
    }

    fn changed(&self) {
        self.changes.set(self.changes.get() + 1);
    }
}

impl Function for PhaseGradients {
    fn name(&self) -> String {
        "PhaseGradients".to_string()
    }

    fn policy(&self) -> &dyn ParameterPolicy {
        &self.block
    }

    fn version(&self) -> u64 {
        self.block.version() + self.axis.version() + self.changes.get()
    }
}

impl Evaluable for PhaseGradients {
    type Result = Complex64;

    fn evaluate(&self, gradient: Option<&mut Vec<Complex64>>) -> Result<Complex64> {
        let igradient = self.igradient.get();
        if igradient >= self.ngradient() {
            return Err(MealError::InvalidState(
                "PhaseGradients::calculate no gradients".to_string(),
            ));
        }

        let x = self.axis.get();
        let phase = (self.block.param(igradient)? + self.offset(igradient)?) * x;
        let value = Complex64::from_polar(1.0, phase);
        trace!(igradient, phase, "PhaseGradients::calculate");

        if let Some(gradient) = gradient {
            reset_gradient(gradient, self.ngradient());
            gradient[igradient] = Complex64::i() * value * x;
        }

        Ok(value)
    }
}
