//! Independent variables.
//!
//! Models that depend on an abscissa (time, frequency, pulse phase, ...) hold
//! a clone of an [`Axis`] and read its current value when evaluated. A data
//! set is a sequence of [`Abscissa`] values, each of which writes itself into
//! the axes it belongs to before the model is evaluated at that point.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Something that can set the independent variables of a model.
pub trait Abscissa {
    /// Write this abscissa into the axes it refers to
    fn apply(&self);
}

/// Models without independent variables.
impl Abscissa for () {
    fn apply(&self) {}
}

/// Two independent variables applied together.
impl<A: Abscissa, B: Abscissa> Abscissa for (A, B) {
    fn apply(&self) {
        self.0.apply();
        self.1.apply();
    }
}

#[derive(Debug)]
struct AxisState<T> {
    value: RefCell<T>,
    version: Cell<u64>,
}

/// A shared, versioned independent variable.
///
/// Cloning an `Axis` yields another handle to the same variable.
#[derive(Debug)]
pub struct Axis<T> {
    state: Rc<AxisState<T>>,
}

impl<T> Clone for Axis<T> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<T: Clone> Axis<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: Rc::new(AxisState {
                value: RefCell::new(value),
                version: Cell::new(0),
            }),
        }
    }

    /// Current value of the variable
    pub fn get(&self) -> T {
        self.state.value.borrow().clone()
    }

    /// Set the variable; every model reading this axis sees the change.
    pub fn set(&self, value: T) {
        *self.state.value.borrow_mut() = value;
        self.state.version.set(self.state.version.get() + 1);
    }

    /// Number of times the variable has been set
    pub fn version(&self) -> u64 {
        self.state.version.get()
    }

    /// Record `value` as an abscissa of this axis
    pub fn value(&self, value: T) -> AxisValue<T> {
        AxisValue {
            axis: self.clone(),
            value,
        }
    }

    /// Record every value of `values` as abscissas of this axis
    pub fn values<I: IntoIterator<Item = T>>(&self, values: I) -> Vec<AxisValue<T>> {
        values.into_iter().map(|v| self.value(v)).collect()
    }
}

impl<T: Clone + Default> Default for Axis<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// One value of an [`Axis`].
#[derive(Debug, Clone)]
pub struct AxisValue<T> {
    axis: Axis<T>,
    value: T,
}

impl<T: Clone> AxisValue<T> {
    pub fn get(&self) -> &T {
        &self.value
    }
}

impl<T: Clone> Abscissa for AxisValue<T> {
    fn apply(&self) {
        self.axis.set(self.value.clone());
    }
}
